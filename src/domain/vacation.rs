use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use time::{Date, OffsetDateTime};

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

pub const MAX_PRICE: i64 = 10_000;
pub const PRICE_DECIMAL_PLACES: u32 = 2;
pub const MAX_IMAGE_LEN: usize = 100;
/// Folder under the media root that vacation images are stored in.
pub const IMAGE_FOLDER: &str = "vacations";
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A vacation as presented to a particular viewer.
#[derive(Debug, Clone, Serialize)]
pub struct Vacation {
    pub id: i64,
    #[serde(rename = "country")]
    pub country_id: i64,
    pub country_name: String,
    pub description: String,
    #[serde(with = "calendar_date")]
    pub start_date: Date,
    #[serde(with = "calendar_date")]
    pub end_date: Date,
    pub price: Decimal,
    pub image: Option<String>,
    pub likes_count: i64,
    pub is_liked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Writable vacation fields, shared by create and full update.
#[derive(Debug, Clone)]
pub struct VacationInput {
    pub country_id: i64,
    pub description: String,
    pub start_date: Date,
    pub end_date: Date,
    pub price: Decimal,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    /// Existing rows may keep a start date that has already passed.
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_A_STRING: &str = "Not a valid string.";
const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

fn take_required(fields: &mut Map<String, Value>, field: &'static str) -> Result<Value, FieldError> {
    match fields.remove(field) {
        None => Err(FieldError::new(field, REQUIRED)),
        Some(Value::Null) => Err(FieldError::new(field, NOT_NULL)),
        Some(value) => Ok(value),
    }
}

fn parse_date(value: Value, field: &'static str) -> Result<Date, FieldError> {
    calendar_date::deserialize(value).map_err(|_| FieldError::new(field, BAD_DATE))
}

impl VacationInput {
    /// Reads a JSON body one field at a time, in form order, so a missing or
    /// mistyped value is reported against its own field.
    pub fn from_json(body: Value) -> Result<Self, FieldError> {
        let Value::Object(mut fields) = body else {
            return Err(FieldError::new(
                "non_field_errors",
                "Invalid data. Expected a dictionary.",
            ));
        };

        let country_id = match take_required(&mut fields, "country")? {
            Value::Number(number) => number.as_i64(),
            Value::String(raw) => raw.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| FieldError::new("country", "Incorrect type. Expected pk value."))?;

        let description = match take_required(&mut fields, "description")? {
            Value::String(description) => description,
            _ => return Err(FieldError::new("description", NOT_A_STRING)),
        };

        let start_date = parse_date(take_required(&mut fields, "start_date")?, "start_date")?;
        let end_date = parse_date(take_required(&mut fields, "end_date")?, "end_date")?;

        let price = serde_json::from_value::<Decimal>(take_required(&mut fields, "price")?)
            .map_err(|_| FieldError::new("price", "A valid number is required."))?;

        let image = match fields.remove("image") {
            None | Some(Value::Null) => None,
            Some(Value::String(image)) => Some(image),
            Some(_) => return Err(FieldError::new("image", NOT_A_STRING)),
        };

        Ok(Self {
            country_id,
            description,
            start_date,
            end_date,
            price,
            image,
        })
    }

    /// Checks every rule that does not need the store. The first failure wins.
    pub fn validate(&self, today: Date, mode: ValidationMode) -> Result<(), FieldError> {
        if self.description.trim().is_empty() {
            return Err(FieldError::new("description", "This field is required."));
        }

        if self.start_date >= self.end_date {
            return Err(FieldError::new(
                "end_date",
                "End date must be after start date.",
            ));
        }

        if mode == ValidationMode::Create && self.start_date < today {
            return Err(FieldError::new(
                "start_date",
                "Start date cannot be in the past.",
            ));
        }

        if self.price < Decimal::ZERO || self.price > Decimal::from(MAX_PRICE) {
            return Err(FieldError::new(
                "price",
                "Price must be between 0 and 10,000.",
            ));
        }

        if self.price.normalize().scale() > PRICE_DECIMAL_PLACES {
            return Err(FieldError::new(
                "price",
                "Ensure that there are no more than 2 decimal places.",
            ));
        }

        if let Some(image) = &self.image {
            if image.chars().count() > MAX_IMAGE_LEN {
                return Err(FieldError::new(
                    "image",
                    "Ensure this value has at most 100 characters.",
                ));
            }
        }

        Ok(())
    }

    pub fn image(&self) -> Option<&str> {
        self.image
            .as_deref()
            .map(str::trim)
            .filter(|image| !image.is_empty())
    }
}

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Picks the stored file extension from an upload's leading bytes. The
/// client's declared content type is not trusted.
pub fn image_extension(bytes: &[u8]) -> Result<&'static str, FieldError> {
    if bytes.is_empty() {
        return Err(FieldError::new("image", "The submitted file is empty."));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(FieldError::new("image", "Image files must be at most 5 MB."));
    }

    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Ok("jpg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Ok("png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Ok("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Ok("webp")
    } else {
        Err(FieldError::new("image", INVALID_IMAGE))
    }
}

/// Where a vacation sits relative to a given day. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalBucket {
    Past,
    Ongoing,
    Future,
}

impl TemporalBucket {
    pub fn classify(start_date: Date, end_date: Date, today: Date) -> Self {
        if is_past(end_date, today) {
            Self::Past
        } else if is_future(start_date, today) {
            Self::Future
        } else {
            Self::Ongoing
        }
    }
}

// These mirror the SQL predicates used by the statistics queries.

pub fn is_past(end_date: Date, today: Date) -> bool {
    end_date < today
}

pub fn is_ongoing(start_date: Date, end_date: Date, today: Date) -> bool {
    start_date <= today && today <= end_date
}

pub fn is_future(start_date: Date, today: Date) -> bool {
    start_date > today
}

pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use time::Duration;

    fn input(start_date: Date, end_date: Date, price: Decimal) -> VacationInput {
        VacationInput {
            country_id: 1,
            description: "Santorini sunsets".to_string(),
            start_date,
            end_date,
            price,
            image: None,
        }
    }

    const TODAY: Date = date!(2030 - 06 - 15);

    #[test]
    fn accepts_valid_future_vacation() {
        let vacation = input(date!(2030 - 07 - 01), date!(2030 - 07 - 10), Decimal::new(150000, 2));
        assert_eq!(vacation.validate(TODAY, ValidationMode::Create), Ok(()));
    }

    #[test]
    fn rejects_start_on_or_after_end() {
        let same_day = input(date!(2030 - 07 - 01), date!(2030 - 07 - 01), Decimal::from(100));
        let err = same_day.validate(TODAY, ValidationMode::Create).unwrap_err();
        assert_eq!(err.field, "end_date");

        let reversed = input(date!(2030 - 07 - 10), date!(2030 - 07 - 01), Decimal::from(100));
        let err = reversed.validate(TODAY, ValidationMode::Update).unwrap_err();
        assert_eq!(err.message, "End date must be after start date.");
    }

    #[test]
    fn rejects_past_start_only_on_create() {
        let vacation = input(date!(2030 - 06 - 14), date!(2030 - 06 - 20), Decimal::from(100));

        let err = vacation.validate(TODAY, ValidationMode::Create).unwrap_err();
        assert_eq!(err.field, "start_date");
        assert_eq!(err.message, "Start date cannot be in the past.");

        assert_eq!(vacation.validate(TODAY, ValidationMode::Update), Ok(()));
    }

    #[test]
    fn start_today_is_not_in_the_past() {
        let vacation = input(TODAY, date!(2030 - 06 - 20), Decimal::from(100));
        assert_eq!(vacation.validate(TODAY, ValidationMode::Create), Ok(()));
    }

    #[test]
    fn enforces_price_bounds() {
        let start = date!(2030 - 07 - 01);
        let end = date!(2030 - 07 - 10);

        for price in [Decimal::ZERO, Decimal::from(MAX_PRICE), Decimal::new(999999, 2)] {
            assert_eq!(input(start, end, price).validate(TODAY, ValidationMode::Create), Ok(()));
        }

        for price in [Decimal::from(-100), Decimal::new(1000001, 2), Decimal::from(20_000)] {
            let err = input(start, end, price)
                .validate(TODAY, ValidationMode::Create)
                .unwrap_err();
            assert_eq!(err.field, "price");
            assert_eq!(err.message, "Price must be between 0 and 10,000.");
        }
    }

    #[test]
    fn rejects_sub_cent_prices() {
        let vacation = input(date!(2030 - 07 - 01), date!(2030 - 07 - 10), Decimal::new(10005, 3));
        let err = vacation.validate(TODAY, ValidationMode::Create).unwrap_err();
        assert_eq!(err.message, "Ensure that there are no more than 2 decimal places.");

        // trailing zeros do not count
        let padded = input(date!(2030 - 07 - 01), date!(2030 - 07 - 10), Decimal::new(10000, 3));
        assert_eq!(padded.validate(TODAY, ValidationMode::Create), Ok(()));
    }

    #[test]
    fn rejects_blank_description_and_long_image() {
        let mut vacation = input(date!(2030 - 07 - 01), date!(2030 - 07 - 10), Decimal::from(100));
        vacation.description = "   ".to_string();
        assert_eq!(
            vacation.validate(TODAY, ValidationMode::Create).unwrap_err().field,
            "description"
        );

        vacation.description = "Tokyo".to_string();
        vacation.image = Some("x".repeat(MAX_IMAGE_LEN + 1));
        assert_eq!(
            vacation.validate(TODAY, ValidationMode::Create).unwrap_err().field,
            "image"
        );
    }

    #[test]
    fn blank_image_is_treated_as_absent() {
        let mut vacation = input(date!(2030 - 07 - 01), date!(2030 - 07 - 10), Decimal::from(100));
        vacation.image = Some("  ".to_string());
        assert_eq!(vacation.image(), None);
        vacation.image = Some("vacations/japan.jpg".to_string());
        assert_eq!(vacation.image(), Some("vacations/japan.jpg"));
    }

    #[test]
    fn recognises_image_formats_by_content() {
        assert_eq!(image_extension(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Ok("jpg"));
        assert_eq!(image_extension(b"\x89PNG\r\n\x1a\n\0\0"), Ok("png"));
        assert_eq!(image_extension(b"GIF89a\x01\x00"), Ok("gif"));
        assert_eq!(image_extension(b"RIFF\x24\0\0\0WEBPVP8 "), Ok("webp"));

        let err = image_extension(b"<svg xmlns='http://www.w3.org/2000/svg'/>").unwrap_err();
        assert_eq!(err, FieldError::new("image", INVALID_IMAGE));
        assert_eq!(image_extension(b"").unwrap_err().field, "image");

        let oversized = vec![0xFF; MAX_IMAGE_BYTES + 1];
        assert_eq!(
            image_extension(&oversized).unwrap_err().message,
            "Image files must be at most 5 MB."
        );
    }

    #[test]
    fn classifies_relative_to_today() {
        assert_eq!(
            TemporalBucket::classify(date!(2030 - 06 - 01), date!(2030 - 06 - 14), TODAY),
            TemporalBucket::Past
        );
        assert_eq!(
            TemporalBucket::classify(date!(2030 - 06 - 01), TODAY, TODAY),
            TemporalBucket::Ongoing
        );
        assert_eq!(
            TemporalBucket::classify(TODAY, date!(2030 - 06 - 20), TODAY),
            TemporalBucket::Ongoing
        );
        assert_eq!(
            TemporalBucket::classify(date!(2030 - 06 - 16), date!(2030 - 06 - 20), TODAY),
            TemporalBucket::Future
        );
    }

    #[test]
    fn buckets_partition_every_valid_range() {
        let origin = date!(2030 - 01 - 01);
        for start_offset in 0..20 {
            for length in 1..10 {
                let start = origin + Duration::days(start_offset);
                let end = start + Duration::days(length);
                for today_offset in -5..35 {
                    let today = origin + Duration::days(today_offset);
                    let hits = [
                        is_past(end, today),
                        is_ongoing(start, end, today),
                        is_future(start, today),
                    ]
                    .iter()
                    .filter(|hit| **hit)
                    .count();
                    assert_eq!(hits, 1, "start={start} end={end} today={today}");
                }
            }
        }
    }

    #[test]
    fn reads_calendar_dates_and_string_prices() {
        let parsed = VacationInput::from_json(serde_json::json!({
            "country": 3,
            "description": "Cape Town",
            "start_date": "2030-01-01",
            "end_date": "2030-01-10",
            "price": "1500.00"
        }))
        .unwrap();
        assert_eq!(parsed.country_id, 3);
        assert_eq!(parsed.start_date, date!(2030 - 01 - 01));
        assert_eq!(parsed.price, Decimal::new(150000, 2));
        assert_eq!(parsed.image, None);

        let numeric = VacationInput::from_json(serde_json::json!({
            "country": "3",
            "description": "Cape Town",
            "start_date": "2030-01-01",
            "end_date": "2030-01-10",
            "price": 750.5,
            "image": "vacations/cape.jpg"
        }))
        .unwrap();
        assert_eq!(numeric.country_id, 3);
        assert_eq!(numeric.price, Decimal::new(7505, 1));
        assert_eq!(numeric.image.as_deref(), Some("vacations/cape.jpg"));
    }

    #[test]
    fn unreadable_fields_name_themselves() {
        let valid = serde_json::json!({
            "country": 3,
            "description": "Cape Town",
            "start_date": "2030-01-01",
            "end_date": "2030-01-10",
            "price": 100
        });

        let cases = [
            ("country", serde_json::json!("three"), "Incorrect type. Expected pk value."),
            ("description", serde_json::json!(12), NOT_A_STRING),
            ("start_date", serde_json::json!("2030-02-30"), BAD_DATE),
            ("end_date", serde_json::json!("10/01/2030"), BAD_DATE),
            ("price", serde_json::json!("cheap"), "A valid number is required."),
            ("price", serde_json::Value::Null, NOT_NULL),
            ("image", serde_json::json!(7), NOT_A_STRING),
        ];
        for (field, value, message) in cases {
            let mut body = valid.clone();
            body[field] = value;
            let err = VacationInput::from_json(body).unwrap_err();
            assert_eq!(err, FieldError::new(field, message));
        }

        for field in ["country", "description", "start_date", "end_date", "price"] {
            let mut body = valid.clone();
            body.as_object_mut().unwrap().remove(field);
            let err = VacationInput::from_json(body).unwrap_err();
            assert_eq!(err, FieldError::new(field, REQUIRED));
        }

        let err = VacationInput::from_json(serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err.field, "non_field_errors");
    }
}
