//! `/despawnrate reload | debug`

use crate::host::CommandSender;
use crate::service::DespawnService;

pub const COMMAND_NAME: &str = "despawnrate";
pub const USAGE: &str = "Usage: /despawnrate reload | debug";

impl DespawnService {
    /// Handle a command. Returns `false` only when `command` is not ours;
    /// bad arguments still count as handled and get a usage line.
    pub fn on_command(&self, sender: &dyn CommandSender, command: &str, args: &[&str]) -> bool {
        if !command.eq_ignore_ascii_case(COMMAND_NAME) {
            return false;
        }
        match args {
            [sub] if sub.eq_ignore_ascii_case("reload") && !self.is_enabled() => {
                sender.send_message("[DespawnRate] disabled; nothing to reload.");
            }
            [sub] if sub.eq_ignore_ascii_case("reload") => match self.reload() {
                Ok(_) => sender.send_message("[DespawnRate] config reloaded."),
                Err(e) => {
                    tracing::warn!(error = %e, "reload failed; keeping previous rules");
                    sender.send_message(&format!("[DespawnRate] reload failed: {e}"));
                }
            },
            [sub] if sub.eq_ignore_ascii_case("debug") => {
                let enabled = self.toggle_debug();
                sender.send_message(&format!("[DespawnRate] debug set to {enabled}"));
                tracing::info!(debug = enabled, by = sender.name(), "debug toggled");
            }
            _ => sender.send_message(USAGE),
        }
        true
    }
}
