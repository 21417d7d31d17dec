//! HS256 JWT download tokens

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use super::{ConsumptionLedger, DownloadClaims, ResourceRef, TokenError, TokenValidator};
use crate::download::ResourceKind;

/// Claims as signed by the control plane
#[derive(Debug, Deserialize)]
struct TokenPayload {
    server_uuid: Uuid,
    #[serde(default)]
    backup_uuid: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    unique_id: String,
    exp: i64,
}

/// Seconds past `exp` a token still verifies; the ledger keeps entries for
/// the same window
const EXPIRY_LEEWAY_SECS: u64 = 0;

/// Verifies tokens signed with a shared secret and tracks their use in an
/// in-memory [`ConsumptionLedger`]
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
    ledger: ConsumptionLedger,
}

impl JwtTokenValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Audience is not part of the download token contract
        validation.validate_aud = false;
        validation.leeway = EXPIRY_LEEWAY_SECS;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ledger: ConsumptionLedger::with_leeway(EXPIRY_LEEWAY_SECS),
        }
    }

    pub const fn ledger(&self) -> &ConsumptionLedger {
        &self.ledger
    }

    fn resource_ref(kind: ResourceKind, payload: &TokenPayload) -> Result<ResourceRef, TokenError> {
        match kind {
            ResourceKind::Backup => {
                let raw = payload
                    .backup_uuid
                    .as_deref()
                    .ok_or(TokenError::MissingClaim("backup_uuid"))?;
                Uuid::parse_str(raw)
                    .map(ResourceRef::Backup)
                    .map_err(TokenError::InvalidBackupId)
            }
            ResourceKind::File => payload
                .file_path
                .clone()
                .filter(|p| !p.is_empty())
                .map(ResourceRef::File)
                .ok_or(TokenError::MissingClaim("file_path")),
        }
    }
}

impl TokenValidator for JwtTokenValidator {
    fn parse(&self, kind: ResourceKind, raw: &str) -> Result<DownloadClaims, TokenError> {
        if raw.is_empty() {
            return Err(TokenError::Missing);
        }

        let payload = decode::<TokenPayload>(raw, &self.key, &self.validation)?.claims;
        if payload.unique_id.is_empty() {
            return Err(TokenError::MissingClaim("unique_id"));
        }

        let resource = Self::resource_ref(kind, &payload)?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(payload.exp, 0).ok_or(TokenError::MissingClaim("exp"))?;

        Ok(DownloadClaims {
            server_uuid: payload.server_uuid,
            resource,
            unique_id: payload.unique_id,
            expires_at,
        })
    }

    fn consume(&self, claims: &DownloadClaims) -> bool {
        self.ledger.consume(&claims.unique_id, claims.expires_at)
    }
}

/// Sign a token the way the control plane does, for tests
#[cfg(test)]
pub fn issue(secret: &str, claims: &serde_json::Value) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn exp() -> i64 {
        Utc::now().timestamp() + 900
    }

    fn validator() -> JwtTokenValidator {
        JwtTokenValidator::new(SECRET)
    }

    #[test]
    fn test_parse_backup_token() {
        let server = Uuid::new_v4();
        let backup = Uuid::new_v4();
        let token = issue(
            SECRET,
            &json!({
                "server_uuid": server,
                "backup_uuid": backup.to_string(),
                "unique_id": "u-1",
                "exp": exp(),
            }),
        );

        let claims = validator().parse(ResourceKind::Backup, &token).unwrap();
        assert_eq!(claims.server_uuid, server);
        assert_eq!(claims.resource, ResourceRef::Backup(backup));
        assert_eq!(claims.unique_id, "u-1");
    }

    #[test]
    fn test_parse_file_token() {
        let token = issue(
            SECRET,
            &json!({
                "server_uuid": Uuid::new_v4(),
                "file_path": "/world/level.dat",
                "unique_id": "u-2",
                "exp": exp(),
            }),
        );

        let claims = validator().parse(ResourceKind::File, &token).unwrap();
        assert_eq!(claims.resource, ResourceRef::File("/world/level.dat".to_string()));
    }

    #[test]
    fn test_rejects_bad_signature_and_garbage() {
        let token = issue(
            "other-secret",
            &json!({
                "server_uuid": Uuid::new_v4(),
                "file_path": "a.txt",
                "unique_id": "u",
                "exp": exp(),
            }),
        );
        let v = validator();
        assert!(matches!(v.parse(ResourceKind::File, &token), Err(TokenError::Invalid(_))));
        assert!(matches!(v.parse(ResourceKind::File, "not-a-jwt"), Err(TokenError::Invalid(_))));
        assert!(matches!(v.parse(ResourceKind::File, ""), Err(TokenError::Missing)));
    }

    #[test]
    fn test_rejects_expired_token() {
        let token = issue(
            SECRET,
            &json!({
                "server_uuid": Uuid::new_v4(),
                "file_path": "a.txt",
                "unique_id": "u",
                "exp": Utc::now().timestamp() - 3600,
            }),
        );
        assert!(matches!(
            validator().parse(ResourceKind::File, &token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_missing_or_invalid_claims() {
        let v = validator();
        let server = Uuid::new_v4();

        let no_unique = issue(SECRET, &json!({ "server_uuid": server, "file_path": "a", "exp": exp() }));
        assert!(matches!(
            v.parse(ResourceKind::File, &no_unique),
            Err(TokenError::MissingClaim("unique_id"))
        ));

        let file_for_backup = issue(
            SECRET,
            &json!({ "server_uuid": server, "file_path": "a", "unique_id": "u", "exp": exp() }),
        );
        assert!(matches!(
            v.parse(ResourceKind::Backup, &file_for_backup),
            Err(TokenError::MissingClaim("backup_uuid"))
        ));

        let bad_backup = issue(
            SECRET,
            &json!({ "server_uuid": server, "backup_uuid": "../../etc", "unique_id": "u", "exp": exp() }),
        );
        assert!(matches!(
            v.parse(ResourceKind::Backup, &bad_backup),
            Err(TokenError::InvalidBackupId(_))
        ));
    }

    #[test]
    fn test_consume_is_single_use() {
        let v = validator();
        let token = issue(
            SECRET,
            &json!({
                "server_uuid": Uuid::new_v4(),
                "file_path": "a.txt",
                "unique_id": "once",
                "exp": exp(),
            }),
        );
        let claims = v.parse(ResourceKind::File, &token).unwrap();
        assert!(v.ledger().is_empty());
        assert!(v.consume(&claims));
        assert!(!v.consume(&claims));
        assert_eq!(v.ledger().len(), 1);
        // Parsing is unaffected by consumption
        assert!(v.parse(ResourceKind::File, &token).is_ok());
    }
}
