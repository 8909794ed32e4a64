/// One default attribute mandated independently of any DTD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlKnownDefaultAttribute {
    pub(crate) elem: String,
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) fixed: bool,
}

/// Table of default attributes that apply even without a DTD.
///
/// The table is owned by the embedder, filled once and shared between
/// checkers. It starts empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlKnownDefaultAttributes {
    entries: Vec<XmlKnownDefaultAttribute>,
}

impl XmlKnownDefaultAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default attribute `name="value"` for elements named `elem`.
    pub fn add(&mut self, elem: &str, name: &str, value: &str, fixed: bool) -> &mut Self {
        self.entries.push(XmlKnownDefaultAttribute {
            elem: elem.to_owned(),
            name: name.to_owned(),
            value: value.to_owned(),
            fixed,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `index`-th default attribute of `elem` as
    /// `(name, value, is_fixed)`.
    pub fn lookup_known_default_attribute(
        &self,
        elem: &str,
        index: usize,
    ) -> Option<(&str, &str, bool)> {
        self.entries
            .iter()
            .filter(|entry| entry.elem == elem)
            .nth(index)
            .map(|entry| (entry.name.as_str(), entry.value.as_str(), entry.fixed))
    }
}
