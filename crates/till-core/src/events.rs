//! # Notification Events
//!
//! Payloads handed to the notification sink after a change commits.
//! Serialized as `{"event": "<name>", "data": {...}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Customer, Feedback, PaymentMethod, Role, Transaction, User};

/// Customer label used when a sale or feedback has no customer.
pub const WALK_IN: &str = "Walk-in";
pub const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    TransactionCompleted(TransactionCompleted),
    FeedbackReceived(FeedbackReceived),
    UserCreated(UserCreated),
}

impl Event {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Event::TransactionCompleted(_) => "transaction_completed",
            Event::FeedbackReceived(_) => "feedback_received",
            Event::UserCreated(_) => "user_created",
        }
    }

    pub fn transaction_completed(
        transaction: &Transaction,
        cashier: &User,
        customer: Option<&Customer>,
    ) -> Self {
        Event::TransactionCompleted(TransactionCompleted {
            id: transaction.id,
            number: transaction.transaction_number.clone(),
            total_amount_cents: transaction.total_amount_cents,
            payment_method: transaction.payment_method,
            cashier: cashier.full_name(),
            customer: customer.map_or_else(|| WALK_IN.to_string(), Customer::full_name),
            completed_at: transaction.completed_at.unwrap_or(transaction.created_at),
        })
    }

    pub fn feedback_received(
        feedback: &Feedback,
        transaction_number: &str,
        customer: Option<&Customer>,
    ) -> Self {
        Event::FeedbackReceived(FeedbackReceived {
            id: feedback.id,
            rating: feedback.rating,
            comment: feedback.comment.clone(),
            transaction_number: transaction_number.to_string(),
            customer: customer.map_or_else(|| ANONYMOUS.to_string(), Customer::full_name),
            created_at: feedback.created_at,
        })
    }

    pub fn user_created(user: &User) -> Self {
        Event::UserCreated(UserCreated {
            id: user.id,
            name: user.full_name(),
            email: user.email.clone(),
            role: user.role,
            employee_id: user.employee_id.clone(),
            created_at: user.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionCompleted {
    pub id: i64,
    pub number: String,
    pub total_amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub cashier: String,
    pub customer: String,
    #[ts(as = "String")]
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FeedbackReceived {
    pub id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub transaction_number: String,
    pub customer: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserCreated {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub employee_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_event_wire_shape() {
        let now = Utc::now();
        let feedback = Feedback {
            id: 3,
            transaction_id: 9,
            customer_id: None,
            rating: 5,
            comment: Some("Quick checkout".to_string()),
            survey_responses: None,
            created_at: now,
            updated_at: now,
        };

        let event = Event::feedback_received(&feedback, "TXN-20260301-ABCDEF01", None);
        assert_eq!(event.name(), "feedback_received");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "feedback_received");
        assert_eq!(json["data"]["customer"], ANONYMOUS);
        assert_eq!(json["data"]["rating"], 5);
        assert_eq!(json["data"]["transaction_number"], "TXN-20260301-ABCDEF01");
    }
}
