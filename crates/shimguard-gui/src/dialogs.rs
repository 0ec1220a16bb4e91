use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use shimguard_core::gate::{ConfirmPrompt, LockPrompt, PromptChoice, PromptIcon};
use shimguard_core::supervisor::{FaultChoice, FaultReporter, SessionFault};
use shimguard_core::APP_NAME;

/// Native message boxes for the two blocking questions the session asks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopDialog;

impl ConfirmPrompt for DesktopDialog {
    fn confirm(&mut self, prompt: &LockPrompt) -> PromptChoice {
        let result = MessageDialog::new()
            .set_level(level(prompt.icon))
            .set_title(prompt.title.as_str())
            .set_description(prompt.message.as_str())
            .set_buttons(MessageButtons::OkCancelCustom(
                prompt.retry_label.clone(),
                prompt.cancel_label.clone(),
            ))
            .show();

        if is_choice(&result, &prompt.retry_label) {
            PromptChoice::Retry
        } else {
            PromptChoice::Cancel
        }
    }
}

impl FaultReporter for DesktopDialog {
    fn report(&mut self, fault: &SessionFault) -> FaultChoice {
        let retry = "Retry".to_string();
        let result = MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title(APP_NAME)
            .set_description(format!(
                "An unexpected error occurred:\n\n{}\n\nRetry, or exit the program?",
                fault
            ))
            .set_buttons(MessageButtons::OkCancelCustom(retry.clone(), "Exit".to_string()))
            .show();

        if is_choice(&result, &retry) {
            FaultChoice::Retry
        } else {
            FaultChoice::Accept
        }
    }
}

/// Show a one-button message.
pub fn show_message(icon: PromptIcon, message: &str) {
    let _ = MessageDialog::new()
        .set_level(level(icon))
        .set_title(APP_NAME)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn level(icon: PromptIcon) -> MessageLevel {
    match icon {
        PromptIcon::Error => MessageLevel::Error,
        PromptIcon::Warning => MessageLevel::Warning,
        PromptIcon::Information => MessageLevel::Info,
    }
}

/// Backends report custom buttons either by label or as plain Ok.
fn is_choice(result: &MessageDialogResult, label: &str) -> bool {
    match result {
        MessageDialogResult::Custom(chosen) => chosen == label,
        MessageDialogResult::Ok | MessageDialogResult::Yes => true,
        _ => false,
    }
}
