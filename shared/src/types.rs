//! API request and response types

use crate::models::{ActivityCategory, ActivityPayload, Gender};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Authentication
// ============================================================================

/// Authentication tokens response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "Display name must be 1-50 characters"))]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Families and Babies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFamilyRequest {
    #[validate(length(min = 1, max = 50, message = "Family name must be 1-50 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinFamilyRequest {
    pub invite_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyResponse {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBabyRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BabyResponse {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub age_months: u32,
}

// ============================================================================
// Activities
// ============================================================================

/// Create or fully replace an activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: ActivityPayload,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub id: String,
    pub baby_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: ActivityPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityListQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<ActivityCategory>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityListResponse {
    pub items: Vec<ActivityResponse>,
    pub count: usize,
}

// ============================================================================
// Growth Measurements
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRequest {
    #[serde(default = "Utc::now")]
    pub measured_at: DateTime<Utc>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub head_circumference_cm: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementResponse {
    pub id: String,
    pub measured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_circumference_cm: Option<f64>,
}

// ============================================================================
// Summary and Guidelines
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    7
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuidelineQuery {
    #[serde(default)]
    pub ibuprofen_mg_per_ml: Option<f64>,
    #[serde(default)]
    pub acetaminophen_mg_per_ml: Option<f64>,
}

// ============================================================================
// Chat
// ============================================================================

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Body of `POST /api/v1/chat`; the last user message is the new turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub baby_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub id: String,
    pub user_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub shared: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareTurnRequest {
    pub shared: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiaperType, StoolCondition};

    #[test]
    fn test_activity_request_flattens_payload() {
        let json = r#"{
            "started_at": "2024-06-15T08:00:00Z",
            "category": "diaper",
            "diaper_type": "stool",
            "stool_condition": "normal",
            "note": "after breakfast"
        }"#;
        let req: ActivityRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.payload,
            ActivityPayload::Diaper {
                diaper_type: DiaperType::Stool,
                stool_condition: Some(StoolCondition::Normal),
            }
        );
        assert_eq!(req.note.as_deref(), Some("after breakfast"));
        assert!(req.ended_at.is_none());
    }

    #[test]
    fn test_chat_request_uses_camel_case_baby_id() {
        let json = r#"{"messages":[{"role":"user","content":"Is 37.8 a fever?"}],"babyId":"abc"}"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.baby_id.as_deref(), Some("abc"));
        assert_eq!(req.messages[0].role, ChatRole::User);
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            display_name: "Mom".to_string(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_summary_query_defaults_to_week() {
        let q: SummaryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.days, 7);
    }
}
