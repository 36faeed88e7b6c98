//! Typed outcomes of the gated EVSE operations

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::charging_session::{ChargeDetailRecord, ChargingSession};
use crate::domain::reservation::Reservation;

/// Behaviour shared by every result-kind enumeration
pub trait ResultKind: Copy + fmt::Debug + fmt::Display + PartialEq + Send + Sync {
    /// Returned while the admin status gate is closed
    fn out_of_service() -> Self;

    /// Returned while no remote execution path is attached
    fn offline() -> Self;

    fn is_success(&self) -> bool;
}

/// Result of a gated operation: kind, optional payload and elapsed time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult<K, P> {
    pub kind: K,
    pub payload: Option<P>,
    pub description: Option<String>,
    /// Wall-clock time the operation took, set by the controller
    #[serde(with = "runtime_millis")]
    pub runtime: Duration,
}

impl<K: ResultKind, P> CommandResult<K, P> {
    pub fn new(kind: K) -> Self {
        Self {
            kind,
            payload: None,
            description: None,
            runtime: Duration::ZERO,
        }
    }

    pub fn out_of_service() -> Self {
        Self::new(K::out_of_service())
    }

    pub fn offline() -> Self {
        Self::new(K::offline())
    }

    pub fn with_payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_runtime(mut self, runtime: Duration) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn is_success(&self) -> bool {
        self.kind.is_success()
    }
}

mod runtime_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(runtime: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(runtime.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

macro_rules! result_kind {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl ResultKind for $name {
            fn out_of_service() -> Self {
                Self::OutOfService
            }

            fn offline() -> Self {
                Self::Offline
            }

            fn is_success(&self) -> bool {
                matches!(self, Self::Success)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

result_kind! {
    /// Outcome of a reserve request
    ReservationResultKind {
        Success,
        OutOfService,
        Offline,
        AlreadyReserved,
        AlreadyInUse,
        Rejected,
        Timeout,
        Error,
    }
}

result_kind! {
    CancelReservationResultKind {
        Success,
        OutOfService,
        Offline,
        UnknownReservationId,
        Rejected,
        Timeout,
        Error,
    }
}

result_kind! {
    /// Outcome of a remote start request
    RemoteStartResultKind {
        Success,
        OutOfService,
        Offline,
        AlreadyInUse,
        Reserved,
        Rejected,
        Timeout,
        Error,
    }
}

result_kind! {
    RemoteStopResultKind {
        Success,
        OutOfService,
        Offline,
        InvalidSessionId,
        Rejected,
        Timeout,
        Error,
    }
}

pub type ReservationResult = CommandResult<ReservationResultKind, Reservation>;
pub type CancelReservationResult = CommandResult<CancelReservationResultKind, Reservation>;
pub type RemoteStartResult = CommandResult<RemoteStartResultKind, ChargingSession>;
pub type RemoteStopResult = CommandResult<RemoteStopResultKind, ChargeDetailRecord>;
