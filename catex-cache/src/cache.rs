pub use string_cache::DefaultAtom as Atom;

/// Interns strings and hands out dense ids.
///
/// Owned by whoever needs it (the renderer keeps one for its text cache);
/// ids are only meaningful for the interner that produced them.
#[derive(Debug, Default, Clone)]
pub struct TextInterner {
    atoms: Vec<Atom>,
}

impl TextInterner {
    pub fn new() -> Self {
        Self { atoms: Vec::new() }
    }

    /// Intern a string and return its ID
    pub fn intern(&mut self, s: &str) -> usize {
        let atom = Atom::from(s);
        match self.atoms.iter().position(|a| *a == atom) {
            Some(idx) => idx,
            None => {
                self.atoms.push(atom);
                self.atoms.len() - 1
            }
        }
    }

    pub fn get(&self, id: usize) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Current count of unique texts
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn clear(&mut self) {
        self.atoms.clear();
    }
}
