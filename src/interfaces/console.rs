use crate::domain::notification::Notification;
use crate::domain::ports::Notifier;

/// Prints notifications to stderr so they never mix with CSV on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_destructive() {
            eprintln!("ERROR {}", notification);
        } else {
            eprintln!("{}", notification);
        }
    }
}
