use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Credential wrapper. The raw value is only reachable through `expose()`;
/// `Debug` and `Serialize` render a fixed mask so no log line or serialized
/// projection can leak the password by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Deliberate access point for collaborators that must authenticate,
    /// e.g. the mysqldump invocation passing MYSQL_PWD.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for Secret {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// How the connection was declared, which doubles as the SSL marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Legacy `user:pass@tcp(host:port)/db` form.
    Tcp,
    /// `mysql://` URL without SSL requirement.
    Url,
    /// `mysql://` URL with `ssl-mode=REQUIRED`.
    UrlSsl,
}

/// One normalized backup target. Produced exclusively by the configuration
/// parser and immutable afterwards; a reload replaces the whole set.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionDescriptor {
    pub name: String,
    pub driver: DriverKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret,
    pub database: String,
    pub group: String,
    pub schedule_override: Option<String>,
    pub retention_override_days: Option<u32>,
    pub enabled: bool,
    pub custom_attributes: BTreeMap<String, String>,
}

/// Outward-facing projection: no password field at all, user partially masked.
#[derive(Debug, Clone, Serialize)]
pub struct SafeInfo {
    pub name: String,
    pub group: String,
    pub driver: DriverKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub enabled: bool,
}

impl ConnectionDescriptor {
    pub fn safe_info(&self) -> SafeInfo {
        SafeInfo {
            name: self.name.clone(),
            group: self.group.clone(),
            driver: self.driver,
            host: self.host.clone(),
            port: self.port,
            user: mask_user(&self.user),
            database: self.database.clone(),
            enabled: self.enabled,
        }
    }

    /// Compact credential-free identity for log lines:
    /// `[group] u***@host:port/database`.
    pub fn display_info(&self) -> String {
        format!(
            "[{}] {}@{}:{}/{}",
            self.group,
            mask_user(&self.user),
            self.host,
            self.port,
            self.database
        )
    }

    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn requires_ssl(&self) -> bool {
        self.driver == DriverKind::UrlSsl
    }
}

fn mask_user(user: &str) -> String {
    match user.chars().next() {
        Some(first) => format!("{first}***"),
        None => String::from("***"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor {
            name: "db1.example.com_3306_app".into(),
            driver: DriverKind::Url,
            host: "db1.example.com".into(),
            port: 3306,
            user: "backup".into(),
            password: Secret::new("s3cr3t-pw"),
            database: "app".into(),
            group: "db1.example.com:3306".into(),
            schedule_override: None,
            retention_override_days: None,
            enabled: true,
            custom_attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn debug_never_contains_password() {
        let d = descriptor();
        let rendered = format!("{d:?}");
        assert!(!rendered.contains("s3cr3t-pw"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn serialized_form_never_contains_password() {
        let d = descriptor();
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("s3cr3t-pw"));
    }

    #[test]
    fn safe_info_masks_user_and_drops_password() {
        let info = descriptor().safe_info();
        assert_eq!(info.user, "b***");
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("s3cr3t-pw"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn display_info_is_credential_free() {
        let line = descriptor().display_info();
        assert_eq!(line, "[db1.example.com:3306] b***@db1.example.com:3306/app");
    }
}
