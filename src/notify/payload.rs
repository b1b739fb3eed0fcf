use crate::agreement::Agreement;
use serde::{Deserialize, Serialize};

/// Wire format for one push backend request.
///
/// `to` is either a topic path ("/topics/{name}") for company broadcasts or
/// a device registration token for individual customers. The `data` block
/// carries the identifiers a receiving app needs to deep-link the alert.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub notification: PushNotification,
    pub data: PushData,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    pub asset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

/// Topic-addressed broadcast to the operating company.
pub fn build_company_payload(topic: &str, agreement: &Agreement, message: &str) -> PushMessage {
    PushMessage {
        to: format!("/topics/{}", topic),
        notification: PushNotification {
            title: "Overspeed alert".to_string(),
            body: message.to_string(),
        },
        data: PushData {
            asset_id: agreement.asset_id.clone(),
            agreement_id: Some(agreement.id.clone()),
            customer_id: None,
        },
    }
}

/// Device-addressed message to the responsible customer.
pub fn build_customer_payload(
    device_token: &str,
    agreement: &Agreement,
    message: &str,
) -> PushMessage {
    PushMessage {
        to: device_token.to_string(),
        notification: PushNotification {
            title: "Speed limit exceeded".to_string(),
            body: message.to_string(),
        },
        data: PushData {
            asset_id: agreement.asset_id.clone(),
            agreement_id: None,
            customer_id: Some(agreement.customer_id.clone()),
        },
    }
}
