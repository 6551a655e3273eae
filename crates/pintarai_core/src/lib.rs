pub mod constants;
pub mod domain;
pub mod order;
pub mod packages;
pub mod ports;
pub mod session;
pub mod testing;

pub use domain::{
    AnswerRequest, ChatSession, ExamplePrompt, IdentitySnapshot, QAPair, UserProfile,
    PENDING_ANSWER,
};
pub use ports::{
    AnswerService, ChatStore, CheckoutSession, CreditOutcome, PaymentGateway, PortError,
    PortResult, PromptSuggestionService, TokenLedger, VerifiedTransaction,
};
pub use session::SessionStore;
