//! Entity identifiers
//!
//! Identifiers follow the hierarchical roaming notation:
//!
//! ```text
//! DE*GEF              operator  (country * operator code)
//! DE*GEF*P1234        charging pool
//! DE*GEF*S1234        charging station
//! DE*GEF*E1234*1      EVSE
//! ```
//!
//! Parsing is case-insensitive and normalises to upper case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::support::errors::{DomainError, DomainResult};

fn invalid(kind: &'static str, value: &str) -> DomainError {
    DomainError::InvalidIdentifier {
        kind,
        value: value.to_string(),
    }
}

fn is_suffix_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '*'
}

/// Splits `"<country>*<code>*<rest>"` into its operator and remainder.
fn split_operator<'a>(kind: &'static str, s: &'a str) -> DomainResult<(OperatorId, &'a str)> {
    let mut parts = s.splitn(3, '*');
    let (Some(country), Some(code), Some(rest)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid(kind, s));
    };
    let operator = OperatorId::new(country, code).map_err(|_| invalid(kind, s))?;
    Ok((operator, rest))
}

/// Parses `"<operator>*<prefix><suffix>"` for pools, stations and EVSEs.
fn parse_child(kind: &'static str, prefix: char, s: &str) -> DomainResult<(OperatorId, String)> {
    let normalized = s.trim().to_ascii_uppercase();
    let (operator, rest) = split_operator(kind, &normalized).map_err(|_| invalid(kind, s))?;
    let suffix = rest.strip_prefix(prefix).ok_or_else(|| invalid(kind, s))?;
    if suffix.is_empty()
        || suffix.starts_with('*')
        || suffix.ends_with('*')
        || !suffix.chars().all(is_suffix_char)
    {
        return Err(invalid(kind, s));
    }
    Ok((operator, suffix.to_string()))
}

// ── Operator ───────────────────────────────────────────────────

/// Charging station operator identifier, e.g. `DE*GEF`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperatorId {
    country: String,
    code: String,
}

impl OperatorId {
    pub fn new(country: &str, code: &str) -> DomainResult<Self> {
        let country = country.trim().to_ascii_uppercase();
        let code = code.trim().to_ascii_uppercase();
        let valid_country = country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic());
        let valid_code = code.len() == 3 && code.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid_country || !valid_code {
            return Err(invalid("operator", &format!("{country}*{code}")));
        }
        Ok(Self { country, code })
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl FromStr for OperatorId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (country, code) = s.trim().split_once('*').ok_or_else(|| invalid("operator", s))?;
        Self::new(country, code).map_err(|_| invalid("operator", s))
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.country, self.code)
    }
}

// ── Pool / Station / EVSE ──────────────────────────────────────

/// Charging pool identifier, e.g. `DE*GEF*P1234`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChargingPoolId {
    operator: OperatorId,
    suffix: String,
}

/// Charging station identifier, e.g. `DE*GEF*S1234`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChargingStationId {
    operator: OperatorId,
    suffix: String,
}

/// EVSE identifier, e.g. `DE*GEF*E1234*1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvseId {
    operator: OperatorId,
    suffix: String,
}

impl ChargingPoolId {
    pub fn new(operator: OperatorId, suffix: &str) -> DomainResult<Self> {
        format!("{operator}*P{suffix}").parse()
    }

    pub fn operator_id(&self) -> &OperatorId {
        &self.operator
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl ChargingStationId {
    pub fn new(operator: OperatorId, suffix: &str) -> DomainResult<Self> {
        format!("{operator}*S{suffix}").parse()
    }

    pub fn operator_id(&self) -> &OperatorId {
        &self.operator
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl EvseId {
    pub fn new(operator: OperatorId, suffix: &str) -> DomainResult<Self> {
        format!("{operator}*E{suffix}").parse()
    }

    pub fn operator_id(&self) -> &OperatorId {
        &self.operator
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl FromStr for ChargingPoolId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (operator, suffix) = parse_child("charging pool", 'P', s)?;
        Ok(Self { operator, suffix })
    }
}

impl FromStr for ChargingStationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (operator, suffix) = parse_child("charging station", 'S', s)?;
        Ok(Self { operator, suffix })
    }
}

impl FromStr for EvseId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (operator, suffix) = parse_child("EVSE", 'E', s)?;
        Ok(Self { operator, suffix })
    }
}

impl fmt::Display for ChargingPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*P{}", self.operator, self.suffix)
    }
}

impl fmt::Display for ChargingStationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*S{}", self.operator, self.suffix)
    }
}

impl fmt::Display for EvseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*E{}", self.operator, self.suffix)
    }
}

// ── Opaque string identifiers ──────────────────────────────────

/// Reservation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReservationId(String);

/// Charging session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChargingSessionId(String);

impl ReservationId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ChargingSessionId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ReservationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("reservation", s));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl FromStr for ChargingSessionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("charging session", s));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ChargingSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlates a request notification with its response and with
/// the status changes it caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTrackingId(Uuid);

impl EventTrackingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventTrackingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventTrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── serde string conversions ───────────────────────────────────

macro_rules! string_conversions {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = DomainError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.to_string()
                }
            }
        )*
    };
}

string_conversions!(
    OperatorId,
    ChargingPoolId,
    ChargingStationId,
    EvseId,
    ReservationId,
    ChargingSessionId,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operator() {
        let id: OperatorId = "de*gef".parse().unwrap();
        assert_eq!(id.country(), "DE");
        assert_eq!(id.code(), "GEF");
        assert_eq!(id.to_string(), "DE*GEF");
    }

    #[test]
    fn rejects_malformed_operator() {
        assert!("DEGEF".parse::<OperatorId>().is_err());
        assert!("D*GEF".parse::<OperatorId>().is_err());
        assert!("DE*GE".parse::<OperatorId>().is_err());
        assert!("".parse::<OperatorId>().is_err());
    }

    #[test]
    fn parses_evse_with_nested_suffix() {
        let id: EvseId = "DE*GEF*E1234*1".parse().unwrap();
        assert_eq!(id.operator_id().to_string(), "DE*GEF");
        assert_eq!(id.suffix(), "1234*1");
        assert_eq!(id.to_string(), "DE*GEF*E1234*1");
    }

    #[test]
    fn child_ids_require_their_prefix() {
        assert!("DE*GEF*S1234".parse::<EvseId>().is_err());
        assert!("DE*GEF*E1234".parse::<ChargingStationId>().is_err());
        assert!("DE*GEF*P".parse::<ChargingPoolId>().is_err());
        assert!("DE*GEF*E1234*".parse::<EvseId>().is_err());
        assert!("DE*GEF*E12-34".parse::<EvseId>().is_err());
    }

    #[test]
    fn constructors_build_from_operator() {
        let operator: OperatorId = "DE*GEF".parse().unwrap();
        let station = ChargingStationId::new(operator.clone(), "77").unwrap();
        let pool = ChargingPoolId::new(operator.clone(), "1").unwrap();
        let evse = EvseId::new(operator, "77*2").unwrap();
        assert_eq!(station.to_string(), "DE*GEF*S77");
        assert_eq!(pool.to_string(), "DE*GEF*P1");
        assert_eq!(evse.to_string(), "DE*GEF*E77*2");
    }

    #[test]
    fn invalid_identifier_error_names_kind() {
        let err = "nope".parse::<EvseId>().unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidIdentifier {
                kind: "EVSE",
                value: "nope".to_string()
            }
        );
    }

    #[test]
    fn empty_reservation_id_is_rejected() {
        assert!("  ".parse::<ReservationId>().is_err());
        assert_eq!("R-1".parse::<ReservationId>().unwrap().as_str(), "R-1");
    }

    #[test]
    fn serde_uses_string_form() {
        let id: EvseId = "DE*GEF*E1*1".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"DE*GEF*E1*1\"");
        let back: EvseId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<EvseId>("\"bogus\"").is_err());
    }
}
