//! Command-line contract
//!
//! Command-line conventions contribute subcommands and global arguments to a
//! shared `clap` command tree.

use clap::Command;
use clap::builder::Str;

#[derive(Debug, Clone)]
pub struct CommandLineBuilder {
    command: Command,
}

impl CommandLineBuilder {
    pub fn new(name: impl Into<Str>) -> Self {
        Self {
            command: Command::new(name),
        }
    }

    /// Add a subcommand.
    pub fn add_command(&mut self, subcommand: Command) -> &mut Self {
        self.configure(|command| command.subcommand(subcommand))
    }

    /// Apply an arbitrary change to the root command.
    pub fn configure(&mut self, f: impl FnOnce(Command) -> Command) -> &mut Self {
        let command = std::mem::replace(&mut self.command, Command::new(""));
        self.command = f(command);
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Names of the registered subcommands, in registration order.
    pub fn subcommand_names(&self) -> Vec<&str> {
        self.command.get_subcommands().map(|c| c.get_name()).collect()
    }

    pub fn build(self) -> Command {
        self.command
    }
}

impl Default for CommandLineBuilder {
    fn default() -> Self {
        Self::new("app")
    }
}
