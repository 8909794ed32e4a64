use super::XmlAttribute;

/// The attribute list of one element type, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub(crate) name: String,
    pub(crate) attributes: Vec<XmlAttribute>,
}

impl XmlElement {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            attributes: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes.iter()
    }

    /// Search the description of the attribute `name` of this element.
    pub fn get_attr_desc(&self, name: &str) -> Option<&XmlAttribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Return the first attribute declared with type ID.
    ///
    /// An element type may have at most one ID attribute, so later ones are
    /// ignored.
    pub fn id_attribute(&self) -> Option<&XmlAttribute> {
        self.attributes.iter().find(|attr| attr.is_id())
    }

    /// Attributes with a value to inject when they are not specified.
    pub fn defaulted_attributes(&self) -> impl Iterator<Item = (&XmlAttribute, &str)> {
        self.attributes
            .iter()
            .filter_map(|attr| attr.defaulted_value().map(|value| (attr, value)))
    }
}
