//! Console-line parser.
//!
//! Turns `kill-process --pid 123 --comment "stop it"` into a
//! [`ParsedCommand`].  The first token is the command name; every `--name`
//! token starts an argument whose value is the next token unless that token
//! is itself an unquoted `--name`.  A single or double quote at the start of
//! a token groups words up to the matching quote and is stripped; a quote
//! inside a word (`don't`) is kept literally.

use responder_types::ValidationError;

/// One `--name [value]` occurrence, in the order it was typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgument {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<ParsedArgument>,
}

impl ParsedCommand {
    /// Every occurrence of `--name`.
    pub fn occurrences<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ParsedArgument> {
        self.args.iter().filter(move |arg| arg.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.args.iter().any(|arg| arg.name == name)
    }

    /// Value of the first occurrence of `--name`, if it carried one.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .filter(|arg| arg.name == name)
            .find_map(|arg| arg.value.as_deref())
    }
}

struct Token {
    text: String,
    quoted: bool,
}

impl Token {
    fn is_argument_name(&self) -> bool {
        !self.quoted && self.text.starts_with("--")
    }
}

/// Parse one console line.
///
/// # Example
///
/// ```
/// use responder_kernel::parser::parse_command_line;
///
/// let cmd = parse_command_line(r#"execute --command "ls -la" --timeout 2m"#).unwrap();
/// assert_eq!(cmd.name, "execute");
/// assert_eq!(cmd.first_value("command"), Some("ls -la"));
/// assert_eq!(cmd.first_value("timeout"), Some("2m"));
/// ```
///
/// # Errors
///
/// Returns a [`ValidationError`] for an empty line, an unterminated quote, a
/// line that starts with an argument, or a value not attached to an argument.
pub fn parse_command_line(input: &str) -> Result<ParsedCommand, ValidationError> {
    let mut tokens = tokenize(input)?.into_iter().peekable();

    let name = match tokens.next() {
        None => return Err(ValidationError::new("No command entered")),
        Some(token) if token.is_argument_name() || token.text.is_empty() => {
            return Err(ValidationError::new(format!(
                "Expected a command name before `{}`",
                token.text
            )));
        }
        Some(token) => token.text,
    };

    let mut args = Vec::new();
    while let Some(token) = tokens.next() {
        if !token.is_argument_name() {
            return Err(ValidationError::for_command(
                &name,
                format!(
                    "Unexpected value `{}`: values must follow an --argument",
                    token.text
                ),
            ));
        }
        let arg_name = token.text[2..].to_string();
        if arg_name.is_empty() {
            return Err(ValidationError::for_command(
                &name,
                "Argument names cannot be empty",
            ));
        }
        let value = match tokens.peek() {
            Some(next) if !next.is_argument_name() => tokens.next().map(|t| t.text),
            _ => None,
        };
        args.push(ParsedArgument {
            name: arg_name,
            value,
        });
    }

    Ok(ParsedCommand { name, args })
}

fn tokenize(input: &str) -> Result<Vec<Token>, ValidationError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if !in_token && (ch == '"' || ch == '\'') => {
                quote = Some(ch);
                quoted = true;
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                    in_token = false;
                    quoted = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(ValidationError::new(format!("Unterminated {q} quote")));
    }
    if in_token {
        tokens.push(Token {
            text: current,
            quoted,
        });
    }
    Ok(tokens)
}
