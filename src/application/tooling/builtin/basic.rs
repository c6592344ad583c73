use chrono::Local;

use crate::application::tooling::registry::ToolOutput;
use crate::constants::QUIT_MESSAGE;

pub(super) fn now_date_time() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(super) fn quit_conversation() -> ToolOutput {
    ToolOutput::Terminate(QUIT_MESSAGE.to_string())
}
