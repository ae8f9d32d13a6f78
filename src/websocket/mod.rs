pub mod handler;
pub mod msg_annotation_handler;
pub mod msg_document_handler;
pub mod msg_join_handler;
pub mod msg_page_handler;
pub mod msg_ping_handler;
pub mod msg_transient_handler;
pub mod relay;
