use catex_core::{Frame, Key};

/// Who is doing the session. Free text as typed; use [`file_stem`] for
/// anything that touches the filesystem.
///
/// [`file_stem`]: Participant::file_stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub number: String,
}

impl Participant {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            number: number.into().trim().to_string(),
        }
    }

    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}",
            sanitize(&self.name, "anonymous"),
            sanitize(&self.number, "0")
        )
    }
}

fn sanitize(part: &str, fallback: &str) -> String {
    let cleaned: String = part
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Editing,
    Submitted(Participant),
}

/// Two-field text entry shown before the instructions.
#[derive(Debug, Clone)]
pub struct ParticipantForm {
    name: String,
    number: String,
    active: Field,
}

impl Default for ParticipantForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantForm {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            number: String::new(),
            active: Field::Name,
        }
    }

    pub fn handle_key(&mut self, key: Key) -> FormStatus {
        let field = match self.active {
            Field::Name => &mut self.name,
            Field::Number => &mut self.number,
        };
        match key {
            Key::Char(c) => field.push(c),
            Key::Space => field.push(' '),
            Key::Backspace => {
                field.pop();
            }
            Key::Enter => match self.active {
                Field::Name if !self.name.trim().is_empty() => self.active = Field::Number,
                Field::Number if !self.number.trim().is_empty() => {
                    return FormStatus::Submitted(Participant::new(&*self.name, &*self.number));
                }
                _ => {}
            },
            Key::Escape => {}
        }
        FormStatus::Editing
    }

    pub fn frame(&self) -> Frame {
        let marker = |f: Field| if self.active == f { "> " } else { "  " };
        Frame::text([
            "Enter Participant Name:".to_string(),
            "Enter Participant Number:".to_string(),
            "Press ENTER to start the experiment.".to_string(),
            format!("{}Name: {}", marker(Field::Name), self.name),
            format!("{}Number: {}", marker(Field::Number), self.number),
        ])
    }
}
