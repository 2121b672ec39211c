pub mod acknowledge_receipt_command;

pub use acknowledge_receipt_command::AcknowledgeReceiptCommand;
