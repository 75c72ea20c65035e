use std::collections::{HashMap, VecDeque};

use crate::app::{SceneDebugCommand, SceneKey};

use super::ConsoleState;

const MAX_PENDING_DEBUG_COMMANDS: usize = 64;
const DEFAULT_DAMAGE_AMOUNT: i32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DebugCommand {
    Quit,
    ResetScene,
    SwitchScene { scene: SceneKey },
    Scene(SceneDebugCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LocalAction {
    Help,
    Clear,
    Echo { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedCommand {
    Local(LocalAction),
    Queueable(DebugCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    fn new(reason: impl Into<String>, usage: &str) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.to_string(),
        }
    }
}

type BuiltinParseFn = fn(&[String]) -> Result<ParsedCommand, CommandParseError>;
type ParseFn = dyn Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync;

pub(crate) struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

pub(crate) struct ConsoleCommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl ConsoleCommandRegistry {
    pub(crate) fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: &[(&str, &str, &str, BuiltinParseFn)] = &[
            ("help", "List commands", "", parse_help),
            ("clear", "Clear console output", "", parse_clear),
            ("echo", "Print text", "<text...>", parse_echo),
            ("quit", "Quit the game", "", |args| {
                no_args_queued(args, "quit", DebugCommand::Quit)
            }),
            ("reset_scene", "Reload the active scene", "", |args| {
                no_args_queued(args, "reset_scene", DebugCommand::ResetScene)
            }),
            (
                "switch_scene",
                "Switch active scene",
                "<title|field>",
                parse_switch_scene,
            ),
            ("recruit", "Add a party member", "<koral|vel>", parse_recruit),
            ("dismiss_last", "Remove the last party member", "", |args| {
                no_args_scene(args, "dismiss_last", SceneDebugCommand::DismissLast)
            }),
            ("heal_all", "Restore the whole party to full HP", "", |args| {
                no_args_scene(args, "heal_all", SceneDebugCommand::HealAll)
            }),
            (
                "damage_all",
                "Damage every party member",
                "[amount:i32]",
                parse_damage_all,
            ),
            ("give_weapons", "Add every weapon to the inventory", "", |args| {
                no_args_scene(args, "give_weapons", SceneDebugCommand::GiveWeapons)
            }),
            ("give_armors", "Add every armor to the inventory", "", |args| {
                no_args_scene(args, "give_armors", SceneDebugCommand::GiveArmors)
            }),
            ("clear_inventory", "Empty the selected inventory", "", |args| {
                no_args_scene(args, "clear_inventory", SceneDebugCommand::ClearInventory)
            }),
            ("give_legendary", "Add the legendary gear", "", |args| {
                no_args_scene(args, "give_legendary", SceneDebugCommand::GiveLegendary)
            }),
            ("unequip_all", "Move all equipment to the inventory", "", |args| {
                no_args_scene(args, "unequip_all", SceneDebugCommand::UnequipAll)
            }),
            ("hitboxes", "Toggle hitbox outlines", "", |args| {
                no_args_scene(args, "hitboxes", SceneDebugCommand::ToggleHitboxes)
            }),
            ("zones", "Toggle interaction zone outlines", "", |args| {
                no_args_scene(args, "zones", SceneDebugCommand::ToggleZones)
            }),
            ("noclip", "Toggle collision for the leader", "", |args| {
                no_args_scene(args, "noclip", SceneDebugCommand::ToggleNoclip)
            }),
            ("god", "Keep the party at full HP", "", |args| {
                no_args_scene(args, "god", SceneDebugCommand::ToggleGodMode)
            }),
            ("teleport_start", "Move the party to the map start", "", |args| {
                no_args_scene(args, "teleport_start", SceneDebugCommand::TeleportToStart)
            }),
            ("max_stats", "Max out party stats", "", |args| {
                no_args_scene(args, "max_stats", SceneDebugCommand::MaxStats)
            }),
            ("reset_stats", "Restore starting stats", "", |args| {
                no_args_scene(args, "reset_stats", SceneDebugCommand::ResetStats)
            }),
            ("party_info", "Print the party roster", "", |args| {
                no_args_scene(args, "party_info", SceneDebugCommand::PartyInfo)
            }),
            ("item_counts", "Print inventory counts", "", |args| {
                no_args_scene(args, "item_counts", SceneDebugCommand::ItemCounts)
            }),
        ];
        for &(name, help, arg_schema, parse) in builtins {
            registry
                .register(name, help, arg_schema, parse)
                .expect("built-in command registration should not fail");
        }
        registry
    }

    pub(crate) fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }
        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    pub(crate) fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let index = self
            .lookup_by_lower_name
            .get(&input_name.to_ascii_lowercase())?;
        self.specs.get(*index)
    }

    pub(crate) fn iter_specs_in_order(&self) -> impl Iterator<Item = &CommandSpec> {
        self.specs.iter()
    }
}

pub(crate) struct ConsoleCommandProcessor {
    registry: ConsoleCommandRegistry,
    pending_debug_commands: VecDeque<DebugCommand>,
}

impl Default for ConsoleCommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCommandProcessor {
    pub(crate) fn new() -> Self {
        Self {
            registry: ConsoleCommandRegistry::with_builtins(),
            pending_debug_commands: VecDeque::new(),
        }
    }

    pub(crate) fn process_pending_lines(&mut self, console: &mut ConsoleState) {
        let mut lines = Vec::new();
        console.drain_pending_lines_into(&mut lines);
        for raw_line in lines {
            self.process_line(console, &raw_line);
        }
    }

    pub(crate) fn drain_pending_debug_commands_into(&mut self, out: &mut Vec<DebugCommand>) {
        out.extend(self.pending_debug_commands.drain(..));
    }

    fn process_line(&mut self, console: &mut ConsoleState, raw_line: &str) {
        let tokens = match tokenize_line(raw_line.trim()) {
            Ok(tokens) => tokens,
            Err(reason) => {
                console.append_output(format!("error: {reason}. usage: help"));
                return;
            }
        };
        let Some((command_name, args)) = tokens.split_first() else {
            return;
        };
        let Some(spec) = self.registry.lookup(command_name) else {
            console.append_output(format!("error: unknown command '{command_name}'. try: help"));
            return;
        };

        match (spec.parse)(args) {
            Ok(ParsedCommand::Local(action)) => self.apply_local_action(console, action),
            Ok(ParsedCommand::Queueable(command)) => {
                if self.pending_debug_commands.len() == MAX_PENDING_DEBUG_COMMANDS {
                    self.pending_debug_commands.pop_front();
                }
                self.pending_debug_commands.push_back(command);
            }
            Err(error) => {
                console.append_output(format!("error: {}. usage: {}", error.reason, error.usage));
            }
        }
    }

    fn apply_local_action(&self, console: &mut ConsoleState, action: LocalAction) {
        match action {
            LocalAction::Help => {
                for spec in self.registry.iter_specs_in_order() {
                    let line = if spec.arg_schema.is_empty() {
                        format!("{} - {}", spec.name, spec.help)
                    } else {
                        format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
                    };
                    console.append_output(line);
                }
            }
            LocalAction::Clear => console.clear_output(),
            LocalAction::Echo { text } => console.append_output(text),
        }
    }
}

/// Splits on whitespace; double quotes group words and may produce an empty token.
fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut token_started = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                token_started = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if token_started {
                    tokens.push(std::mem::take(&mut current));
                    token_started = false;
                }
            }
            _ => {
                current.push(ch);
                token_started = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if token_started {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_help(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_clear(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "clear")?;
    Ok(ParsedCommand::Local(LocalAction::Clear))
}

fn parse_echo(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError::new(
            "missing required argument <text...>",
            "echo <text...>",
        ));
    }
    Ok(ParsedCommand::Local(LocalAction::Echo {
        text: args.join(" "),
    }))
}

fn parse_switch_scene(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "switch_scene <title|field>";
    let [scene_name] = args else {
        return Err(CommandParseError::new(
            "expected exactly one argument <scene>",
            USAGE,
        ));
    };
    let scene = match scene_name.to_ascii_lowercase().as_str() {
        "title" => SceneKey::Title,
        "field" => SceneKey::Field,
        _ => {
            return Err(CommandParseError::new(
                format!("unknown scene '{scene_name}' (expected title|field)"),
                USAGE,
            ));
        }
    };
    Ok(ParsedCommand::Queueable(DebugCommand::SwitchScene { scene }))
}

fn parse_recruit(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let [name] = args else {
        return Err(CommandParseError::new(
            "expected exactly one argument <name>",
            "recruit <koral|vel>",
        ));
    };
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::Recruit {
            name: name.to_ascii_lowercase(),
        },
    )))
}

fn parse_damage_all(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "damage_all [amount]";
    let amount = match args {
        [] => DEFAULT_DAMAGE_AMOUNT,
        [raw] => raw
            .parse::<i32>()
            .ok()
            .filter(|amount| *amount >= 0)
            .ok_or_else(|| {
                CommandParseError::new(
                    format!("invalid amount '{raw}' (expected non-negative i32)"),
                    USAGE,
                )
            })?,
        _ => return Err(CommandParseError::new("unexpected extra arguments", USAGE)),
    };
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::DamageAll { amount },
    )))
}

fn no_args_queued(
    args: &[String],
    usage: &str,
    command: DebugCommand,
) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, usage)?;
    Ok(ParsedCommand::Queueable(command))
}

fn no_args_scene(
    args: &[String],
    usage: &str,
    command: SceneDebugCommand,
) -> Result<ParsedCommand, CommandParseError> {
    no_args_queued(args, usage, DebugCommand::Scene(command))
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_lines(lines: &[&str]) -> (Vec<String>, Vec<DebugCommand>) {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        for line in lines {
            console.push_pending_line_for_test(line);
        }
        processor.process_pending_lines(&mut console);
        let mut commands = Vec::new();
        processor.drain_pending_debug_commands_into(&mut commands);
        let output = console.output_lines().map(ToString::to_string).collect();
        (output, commands)
    }

    #[test]
    fn help_lists_commands_in_registration_order() {
        let (output, commands) = run_lines(&["help"]);
        assert!(commands.is_empty());
        assert_eq!(output[0], "help - List commands");
        assert_eq!(output[1], "clear - Clear console output");
        assert!(output.iter().any(|line| line == "recruit <koral|vel> - Add a party member"));
        assert_eq!(output.last().map(String::as_str), Some("item_counts - Print inventory counts"));
    }

    #[test]
    fn unknown_command_and_bad_args_report_errors() {
        let (output, commands) = run_lines(&["fly", "heal_all now", "damage_all -5"]);
        assert!(commands.is_empty());
        assert_eq!(output[0], "error: unknown command 'fly'. try: help");
        assert_eq!(output[1], "error: unexpected extra arguments. usage: heal_all");
        assert!(output[2].starts_with("error: invalid amount '-5'"));
    }

    #[test]
    fn scene_commands_are_queued_in_order() {
        let (_, commands) = run_lines(&["RECRUIT Koral", "damage_all", "damage_all 5", "god"]);
        assert_eq!(
            commands,
            vec![
                DebugCommand::Scene(SceneDebugCommand::Recruit {
                    name: "koral".to_string()
                }),
                DebugCommand::Scene(SceneDebugCommand::DamageAll { amount: 30 }),
                DebugCommand::Scene(SceneDebugCommand::DamageAll { amount: 5 }),
                DebugCommand::Scene(SceneDebugCommand::ToggleGodMode),
            ]
        );
    }

    #[test]
    fn switch_scene_accepts_only_known_scenes() {
        let (output, commands) = run_lines(&["switch_scene field", "switch_scene dungeon"]);
        assert_eq!(
            commands,
            vec![DebugCommand::SwitchScene {
                scene: SceneKey::Field
            }]
        );
        assert!(output[0].contains("unknown scene 'dungeon'"));
    }

    #[test]
    fn local_commands_run_immediately() {
        let (output, commands) = run_lines(&["echo \"hola mundo\" !", "clear", "echo x"]);
        assert!(commands.is_empty());
        assert_eq!(output, vec!["x".to_string()]);
    }

    #[test]
    fn tokenizer_handles_quotes_and_errors() {
        assert_eq!(
            tokenize_line("echo \"a b\" \"\" c").expect("tokens"),
            vec!["echo", "a b", "", "c"]
        );
        assert!(tokenize_line("echo \"open").is_err());
        assert!(tokenize_line("   ").expect("tokens").is_empty());
    }

    #[test]
    fn pending_queue_is_bounded() {
        let lines: Vec<&str> = std::iter::repeat("god")
            .take(MAX_PENDING_DEBUG_COMMANDS + 5)
            .collect();
        let (_, commands) = run_lines(&lines);
        assert!(commands.len() <= MAX_PENDING_DEBUG_COMMANDS);
    }
}
