use chrono::{DateTime, Utc};

use crate::domain::{BillingStatus, Invoice, InvoiceStatus, Payment, PaymentStatus};

/// Outcome of the billing gate for one enrollment.
#[derive(Debug, Clone)]
pub struct BillingResolution {
    pub status: BillingStatus,
    pub label: String,
}

/// Classifies an enrollment from its most recent payment. Pure function:
/// callers fetch the payment and its invoice, check-in and the roster both
/// go through here so they can never disagree.
///
/// No payment at all is treated as paid ("no active charge") rather than
/// blocking the student.
pub fn resolve(payment: Option<&Payment>, invoice: Option<&Invoice>, now: DateTime<Utc>) -> BillingResolution {
    let Some(payment) = payment else {
        return BillingResolution {
            status: BillingStatus::Paid,
            label: "No active charge".to_string(),
        };
    };

    let invoice_paid = invoice.map(|i| i.status == InvoiceStatus::Paid).unwrap_or(false);

    if payment.status == PaymentStatus::Paid || invoice_paid {
        return BillingResolution {
            status: BillingStatus::Paid,
            label: "Paid".to_string(),
        };
    }

    if payment.status == PaymentStatus::Failed {
        return BillingResolution {
            status: BillingStatus::Overdue,
            label: "Payment failed".to_string(),
        };
    }

    if payment.due_date < now {
        BillingResolution {
            status: BillingStatus::Overdue,
            label: "Payment overdue".to_string(),
        }
    } else {
        BillingResolution {
            status: BillingStatus::Pending,
            label: "Payment pending".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn payment(status: PaymentStatus, due_in_days: i64) -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            enrollment_id: None,
            amount_cents: 9500,
            status,
            method: crate::domain::PaymentMethod::CreditCard,
            description: "test".to_string(),
            due_date: now + Duration::days(due_in_days),
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn no_payment_is_permissive() {
        let res = resolve(None, None, Utc::now());
        assert_eq!(res.status, BillingStatus::Paid);
        assert_eq!(res.label, "No active charge");
    }

    #[test]
    fn paid_payment_wins() {
        let p = payment(PaymentStatus::Paid, -10);
        let res = resolve(Some(&p), None, Utc::now());
        assert_eq!(res.status, BillingStatus::Paid);
    }

    #[test]
    fn paid_invoice_counts_as_paid() {
        let p = payment(PaymentStatus::Pending, 2);
        let inv = Invoice {
            id: Uuid::new_v4(),
            payment_id: p.id,
            status: InvoiceStatus::Paid,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let res = resolve(Some(&p), Some(&inv), Utc::now());
        assert_eq!(res.status, BillingStatus::Paid);
    }

    #[test]
    fn failed_payment_is_overdue() {
        let p = payment(PaymentStatus::Failed, 2);
        let res = resolve(Some(&p), None, Utc::now());
        assert_eq!(res.status, BillingStatus::Overdue);
    }

    #[test]
    fn pending_past_due_is_overdue() {
        let p = payment(PaymentStatus::Pending, -1);
        let res = resolve(Some(&p), None, Utc::now());
        assert_eq!(res.status, BillingStatus::Overdue);
    }

    #[test]
    fn pending_before_due_is_pending() {
        let p = payment(PaymentStatus::Pending, 2);
        let res = resolve(Some(&p), None, Utc::now());
        assert_eq!(res.status, BillingStatus::Pending);
    }
}
