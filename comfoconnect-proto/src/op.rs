//! Envelope operation and result enumerations

use comfoconnect_core::ComfoError;

/// Operation type carried in the envelope, selects the inner payload message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum OperationType {
    NoOperation = 0,
    SetAddressRequest = 1,
    RegisterAppRequest = 2,
    StartSessionRequest = 3,
    CloseSessionRequest = 4,
    ListRegisteredAppsRequest = 5,
    DeregisterAppRequest = 6,
    ChangePinRequest = 7,
    VersionRequest = 18,
    CnTimeRequest = 30,
    CnTimeConfirm = 31,
    CnNodeNotification = 32,
    CnRmiRequest = 33,
    CnRmiResponse = 34,
    CnRmiAsyncRequest = 35,
    CnRmiAsyncConfirm = 36,
    CnRmiAsyncResponse = 37,
    CnRpdoRequest = 38,
    CnRpdoConfirm = 39,
    CnRpdoNotification = 40,
    CnAlarmNotification = 41,
    CnNodeRequest = 42,
    SetAddressConfirm = 51,
    RegisterAppConfirm = 52,
    StartSessionConfirm = 53,
    CloseSessionConfirm = 54,
    ListRegisteredAppsConfirm = 55,
    DeregisterAppConfirm = 56,
    ChangePinConfirm = 57,
    VersionConfirm = 68,
    GatewayNotification = 100,
    KeepAlive = 101,
    FactoryReset = 102,
}

impl OperationType {
    /// Create from the wire discriminant
    pub fn from_u32(value: u32) -> Option<Self> {
        use OperationType::*;
        match value {
            0 => Some(NoOperation),
            1 => Some(SetAddressRequest),
            2 => Some(RegisterAppRequest),
            3 => Some(StartSessionRequest),
            4 => Some(CloseSessionRequest),
            5 => Some(ListRegisteredAppsRequest),
            6 => Some(DeregisterAppRequest),
            7 => Some(ChangePinRequest),
            18 => Some(VersionRequest),
            30 => Some(CnTimeRequest),
            31 => Some(CnTimeConfirm),
            32 => Some(CnNodeNotification),
            33 => Some(CnRmiRequest),
            34 => Some(CnRmiResponse),
            35 => Some(CnRmiAsyncRequest),
            36 => Some(CnRmiAsyncConfirm),
            37 => Some(CnRmiAsyncResponse),
            38 => Some(CnRpdoRequest),
            39 => Some(CnRpdoConfirm),
            40 => Some(CnRpdoNotification),
            41 => Some(CnAlarmNotification),
            42 => Some(CnNodeRequest),
            51 => Some(SetAddressConfirm),
            52 => Some(RegisterAppConfirm),
            53 => Some(StartSessionConfirm),
            54 => Some(CloseSessionConfirm),
            55 => Some(ListRegisteredAppsConfirm),
            56 => Some(DeregisterAppConfirm),
            57 => Some(ChangePinConfirm),
            68 => Some(VersionConfirm),
            100 => Some(GatewayNotification),
            101 => Some(KeepAlive),
            102 => Some(FactoryReset),
            _ => None,
        }
    }

    /// Convert to the wire discriminant
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// The reply operation a request of this type correlates with.
    ///
    /// `None` for fire-and-forget operations and for operations that are
    /// themselves replies or notifications.
    pub fn expected_confirm(self) -> Option<OperationType> {
        use OperationType::*;
        match self {
            SetAddressRequest => Some(SetAddressConfirm),
            RegisterAppRequest => Some(RegisterAppConfirm),
            StartSessionRequest => Some(StartSessionConfirm),
            CloseSessionRequest => Some(CloseSessionConfirm),
            ListRegisteredAppsRequest => Some(ListRegisteredAppsConfirm),
            DeregisterAppRequest => Some(DeregisterAppConfirm),
            ChangePinRequest => Some(ChangePinConfirm),
            VersionRequest => Some(VersionConfirm),
            CnTimeRequest => Some(CnTimeConfirm),
            CnRmiRequest => Some(CnRmiResponse),
            CnRmiAsyncRequest => Some(CnRmiAsyncConfirm),
            CnRpdoRequest => Some(CnRpdoConfirm),
            _ => None,
        }
    }
}

/// Result code carried in the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum GatewayResult {
    #[default]
    Ok = 0,
    BadRequest = 1,
    InternalError = 2,
    NotReachable = 3,
    OtherSession = 4,
    NotAllowed = 5,
    NoResources = 6,
    NotExist = 7,
    RmiError = 8,
}

impl GatewayResult {
    /// Create from the wire discriminant
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::BadRequest),
            2 => Some(Self::InternalError),
            3 => Some(Self::NotReachable),
            4 => Some(Self::OtherSession),
            5 => Some(Self::NotAllowed),
            6 => Some(Self::NoResources),
            7 => Some(Self::NotExist),
            8 => Some(Self::RmiError),
            _ => None,
        }
    }

    /// Convert to the wire discriminant
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// Map a non-OK result to the matching error, `None` for `Ok`.
    ///
    /// `RmiError` is mapped by the caller, which has access to the RMI status
    /// code in the response payload.
    pub fn as_error(self) -> Option<ComfoError> {
        match self {
            Self::Ok => None,
            Self::BadRequest => Some(ComfoError::BadRequest),
            Self::InternalError => Some(ComfoError::InternalError),
            Self::NotReachable => Some(ComfoError::UnitNotReachable),
            Self::OtherSession => Some(ComfoError::OtherSession),
            Self::NotAllowed => Some(ComfoError::NotAllowed),
            Self::NoResources => Some(ComfoError::NoResources),
            Self::NotExist => Some(ComfoError::NotExist),
            Self::RmiError => Some(ComfoError::Rmi(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_discriminants() {
        for op in [
            OperationType::StartSessionRequest,
            OperationType::CnRmiRequest,
            OperationType::CnRpdoNotification,
            OperationType::KeepAlive,
        ] {
            assert_eq!(OperationType::from_u32(op.to_u32()), Some(op));
        }
        assert_eq!(OperationType::from_u32(9999), None);
    }

    #[test]
    fn test_request_confirm_mapping() {
        assert_eq!(
            OperationType::StartSessionRequest.expected_confirm(),
            Some(OperationType::StartSessionConfirm)
        );
        assert_eq!(
            OperationType::CnRmiRequest.expected_confirm(),
            Some(OperationType::CnRmiResponse)
        );
        assert_eq!(OperationType::KeepAlive.expected_confirm(), None);
        assert_eq!(OperationType::CnRpdoNotification.expected_confirm(), None);
    }

    #[test]
    fn test_result_errors() {
        assert!(GatewayResult::Ok.as_error().is_none());
        assert!(matches!(
            GatewayResult::NotAllowed.as_error(),
            Some(ComfoError::NotAllowed)
        ));
        assert!(matches!(
            GatewayResult::NotExist.as_error(),
            Some(ComfoError::NotExist)
        ));
    }
}
