use crate::library::communication::event::QueueDescriptor;

/// Requests from the presentation tier to the business tier
pub const BLL_REQUEST_QUEUE: &str = "bll_request_queue";
/// Replies from the business tier to the presentation tier
pub const UI_RESPONSE_QUEUE: &str = "ui_response_queue";
/// Requests from the business tier to the data tier
pub const DAL_REQUEST_QUEUE: &str = "dal_request_queue";
/// Replies from the data tier to the business tier
pub const DAL_RESPONSE_QUEUE: &str = "dal_response_queue";

/// Queue on which the business tier receives requests
pub fn bll_request_queue() -> QueueDescriptor {
    QueueDescriptor::named(BLL_REQUEST_QUEUE)
}

/// Queue on which the presentation tier receives replies
pub fn ui_response_queue() -> QueueDescriptor {
    QueueDescriptor::named(UI_RESPONSE_QUEUE)
}

/// Queue on which the data tier receives requests
pub fn dal_request_queue() -> QueueDescriptor {
    QueueDescriptor::named(DAL_REQUEST_QUEUE)
}

/// Queue on which the business tier receives replies from the data tier
pub fn dal_response_queue() -> QueueDescriptor {
    QueueDescriptor::named(DAL_RESPONSE_QUEUE)
}
