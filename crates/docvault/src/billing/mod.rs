//! Payment submission and admin review.

mod workflow;

pub use workflow::{
    ApprovalOutcome, ApprovalTerms, PaymentRequest, PaymentWorkflow, RejectionOutcome,
};
