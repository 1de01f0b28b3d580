use crate::domain::ports::FormState;
use std::collections::HashMap;

/// Form values held in memory, e.g. parsed from command line arguments.
#[derive(Debug, Clone, Default)]
pub struct MemoryFormState {
    values: HashMap<String, String>,
    geometry_field: Option<String>,
}

impl MemoryFormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, field: &str, value: &str) -> Self {
        self.values.insert(field.to_string(), value.to_string());
        self
    }

    pub fn with_geometry_field(mut self, field: &str) -> Self {
        self.geometry_field = Some(field.to_string());
        self
    }

    pub fn set_value(&mut self, field: String, value: String) {
        self.values.insert(field, value);
    }

    pub fn set_geometry_field(&mut self, field: Option<String>) {
        self.geometry_field = field;
    }
}

impl FormState for MemoryFormState {
    fn value(&self, field: &str) -> Option<String> {
        self.values.get(field).cloned()
    }

    fn geometry_field(&self) -> Option<&str> {
        self.geometry_field.as_deref()
    }
}
