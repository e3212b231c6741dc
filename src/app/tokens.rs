use anyhow::{anyhow, Result};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Which service a token was minted for. Tokens never cross over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Content,
    Stats,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "vacations-content",
            Self::Stats => "vacations-stats",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub user_id: i64,
    pub jti: Uuid,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct TokenIssuer {
    key: [u8; 32],
}

impl TokenIssuer {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn issue(
        &self,
        audience: Audience,
        user_id: i64,
        ttl_hours: u64,
        extra: &[(&str, &str)],
    ) -> Result<IssuedToken> {
        let ttl_seconds = ttl_hours
            .checked_mul(60 * 60)
            .and_then(|seconds| i64::try_from(seconds).ok())
            .ok_or_else(|| anyhow!("token ttl of {} hours is out of range", ttl_hours))?;
        let ttl = Duration::seconds(ttl_seconds);
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(ttl)
            .ok_or_else(|| anyhow!("token ttl of {} hours is out of range", ttl_hours))?;
        let duration = ttl.unsigned_abs();
        let jti = Uuid::new_v4();

        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(audience.as_str())?;
        claims.audience(audience.as_str())?;
        claims.subject(&user_id.to_string())?;
        claims.token_identifier(&jti.to_string())?;
        for (name, value) in extra {
            claims.add_additional(name, *value)?;
        }

        let key = SymmetricKey::<V4>::from(&self.key)?;
        let token = local::encrypt(&key, &claims, None, None)?;

        Ok(IssuedToken {
            token,
            jti,
            expires_at,
        })
    }

    /// `Ok(None)` for anything that is not a live token for `audience`.
    pub fn verify(&self, audience: Audience, token: &str) -> Result<Option<VerifiedToken>> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(audience.as_str());
        rules.validate_audience_with(audience.as_str());

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let Some(claims) = trusted.payload_claims() else {
            return Ok(None);
        };

        let user_id = claim_str(claims, "sub")?
            .parse::<i64>()
            .map_err(|err| anyhow!("invalid sub claim: {}", err))?;
        let jti = Uuid::parse_str(claim_str(claims, "jti")?)?;
        let expires_at = OffsetDateTime::parse(claim_str(claims, "exp")?, &Rfc3339)?;

        Ok(Some(VerifiedToken {
            user_id,
            jti,
            expires_at,
        }))
    }
}

fn claim_str<'a>(claims: &'a Claims, name: &str) -> Result<&'a str> {
    claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))
}
