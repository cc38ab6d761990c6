use crate::poller::Dispatcher;
use crate::store::{ExecutionLogStore, ScheduledActionStore};

#[derive(Clone)]
pub struct AppState {
    pub store: ScheduledActionStore,
    pub audit: ExecutionLogStore,
    pub dispatcher: Dispatcher,
}
