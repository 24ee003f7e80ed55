/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "workflows",
    aliases: &["w", "wf", "workflow"],
    description: "Application workflows and their stages",
  },
  Command {
    name: "tags",
    aliases: &["t", "tag"],
    description: "Client tags",
  },
  Command {
    name: "doctypes",
    aliases: &["d", "dt", "documents", "document-types"],
    description: "Document types",
  },
  Command {
    name: "taxes",
    aliases: &["tax", "tax-settings"],
    description: "Tax settings",
  },
  Command {
    name: "payments",
    aliases: &["p", "payment", "manual-payments"],
    description: "Manual payment details",
  },
  Command {
    name: "emails",
    aliases: &["e", "email", "company-emails"],
    description: "Company email accounts",
  },
  Command {
    name: "templates",
    aliases: &["tpl", "template", "email-templates"],
    description: "Email templates",
  },
  Command {
    name: "checklists",
    aliases: &["c", "cl", "checklist", "document-checklists"],
    description: "Document checklists per workflow",
  },
  Command {
    name: "business",
    aliases: &["b", "biz", "business-information", "invoice-address"],
    description: "Registration number and invoice address",
  },
  Command {
    name: "agency",
    aliases: &["a", "preferences", "prefs"],
    description: "Agency profile and contact details",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit crmdeck",
  },
];

/// Resolve an exact name or alias, case-insensitively.
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
