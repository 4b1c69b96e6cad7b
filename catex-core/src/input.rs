use catex_cache::Atom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Response category symbol ("happy", "circle", ...).
///
/// Backed by an interned atom so trials and results can clone it freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Category(Atom);

impl Category {
    pub fn new(name: &str) -> Self {
        Self(Atom::from(name))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self(Atom::from(s))
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_owned()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys the runner cares about. Everything printable arrives as `Char`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Escape,
    Backspace,
}

impl Key {
    /// Case-folded form used for response matching.
    pub fn normalized(self) -> Self {
        match self {
            Key::Char(c) => Key::Char(c.to_ascii_lowercase()),
            other => other,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Space => f.write_str("space"),
            Key::Enter => f.write_str("enter"),
            Key::Escape => f.write_str("escape"),
            Key::Backspace => f.write_str("backspace"),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "space" => Ok(Key::Space),
            "enter" | "return" => Ok(Key::Enter),
            "escape" | "esc" => Ok(Key::Escape),
            "backspace" => Ok(Key::Backspace),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_control() => Ok(Key::Char(c)),
                    _ => Err(format!("unknown key name `{s}`")),
                }
            }
        }
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Key> for String {
    fn from(k: Key) -> Self {
        k.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: Key,
    pub category: Category,
}

/// Key → category table for the response phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    bindings: Vec<KeyBinding>,
}

impl KeyMap {
    pub fn new(bindings: Vec<KeyBinding>) -> Self {
        Self { bindings }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (char, &'a str)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(c, name)| KeyBinding {
                    key: Key::Char(c),
                    category: Category::new(name),
                })
                .collect(),
        )
    }

    pub fn category_for(&self, key: Key) -> Option<&Category> {
        let key = key.normalized();
        self.bindings
            .iter()
            .find(|b| b.key.normalized() == key)
            .map(|b| &b.category)
    }

    pub fn key_for(&self, category: &Category) -> Option<Key> {
        self.bindings
            .iter()
            .find(|b| &b.category == category)
            .map(|b| b.key)
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }
}

/// What the display/input surface reports on each poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Key press stamped with the runner's clock (ns).
    KeyDown { key: Key, timestamp_ns: u64 },
    /// Window close or escape: abort the session.
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_parse() {
        assert_eq!("space".parse::<Key>(), Ok(Key::Space));
        assert_eq!("Return".parse::<Key>(), Ok(Key::Enter));
        assert_eq!("esc".parse::<Key>(), Ok(Key::Escape));
        assert_eq!("J".parse::<Key>(), Ok(Key::Char('j')));
        assert!("jk".parse::<Key>().is_err());
        assert!("".parse::<Key>().is_err());
    }

    #[test]
    fn lookup_ignores_case() {
        let map = KeyMap::from_pairs([('j', "happy"), ('k', "neutral"), ('l', "angry")]);
        assert_eq!(map.category_for(Key::Char('J')), Some(&Category::new("happy")));
        assert_eq!(map.category_for(Key::Char('l')).map(Category::as_str), Some("angry"));
        assert_eq!(map.category_for(Key::Char('x')), None);
        assert_eq!(map.category_for(Key::Space), None);
        assert_eq!(map.key_for(&Category::new("neutral")), Some(Key::Char('k')));
    }

    #[test]
    fn key_map_json_shape() {
        let map = KeyMap::from_pairs([('z', "happy")]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"[{"key":"z","category":"happy"}]"#);
        let back: KeyMap = serde_json::from_str(r#"[{"key":"Space","category":"go"}]"#).unwrap();
        assert_eq!(back.category_for(Key::Space), Some(&Category::new("go")));
    }

    #[test]
    fn categories_compare_by_name() {
        assert_eq!(Category::new("circle"), Category::from(String::from("circle")));
        assert_ne!(Category::new("circle"), Category::new("square"));
        assert_eq!(Category::new("square").to_string(), "square");
    }
}
