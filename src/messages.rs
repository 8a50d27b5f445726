//! Texts sent to the chat.

use crate::types::InboundSms;

pub const SYSTEM_HEAD: &str = "[System Information]";
pub const SEND_HEAD: &str = "[Send SMS]";
pub const RECEIVE_HEAD: &str = "[Receive SMS]";

pub const NOT_AVAILABLE: &str = "Not available";

pub const POLLING_STOPPED: &str =
    "[System Information]\nGateway session lost, inbox polling stopped.";

pub fn help() -> String {
    format!(
        "{SYSTEM_HEAD}\nAvailable Commands:\n/getinfo - Get system information\n/sendsms - Send SMS"
    )
}

pub fn device_info() -> String {
    format!(
        "{SYSTEM_HEAD}\nBattery Level: {NOT_AVAILABLE}\nNetwork status: {NOT_AVAILABLE}\nSIM: {NOT_AVAILABLE}"
    )
}

pub fn forward_notice(sms: &InboundSms) -> String {
    format!(
        "{RECEIVE_HEAD}\nFrom: {}\nContent: {}\nDate: {}",
        sms.phone, sms.content, sms.date
    )
}

pub fn send_confirmation(phone: &str, content: &str) -> String {
    format!("{SEND_HEAD}\nTo: {phone}\nContent: {content}")
}

pub fn send_failed(reason: &str) -> String {
    format!("{SEND_HEAD}\nFailed to send: {reason}")
}

/// A `[Send SMS]` prompt or notice.
pub fn send_notice(text: &str) -> String {
    format!("{SEND_HEAD}\n{text}")
}

pub const ASK_PHONE: &str = "Please enter the receiver's number.";
pub const ASK_PHONE_AGAIN: &str = "This phone number is invalid. Please enter it again.";
pub const ILLEGAL_PHONE: &str = "This is not a legal phone number.";
pub const ASK_BODY: &str = "Please enter the message to be sent.";
pub const EMPTY_BODY: &str = "The message content is empty.";
pub const SESSION_UPDATE_FAILED: &str = "Unable to update login session information.";
