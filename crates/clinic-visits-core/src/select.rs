//! Select control state for the check-in form.
//!
//! A dropdown is either closed or open. Clicking the control toggles it,
//! choosing an option closes it, and a pointer press outside its bounds
//! dismisses it.

use crate::models::{Department, GENDER_OPTIONS};

const FALLBACK_PLACEHOLDER: &str = "Select option";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Screen area occupied by a control.
pub trait PointerBounds {
    fn contains(&self, point: Point) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PointerBounds for Rect {
    fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownState {
    Closed,
    Open,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dropdown {
    options: Vec<String>,
    value: Option<String>,
    placeholder: Option<String>,
    state: DropdownState,
}

impl Dropdown {
    pub fn new(options: Vec<String>, value: Option<String>) -> Self {
        Self {
            options,
            value,
            placeholder: None,
            state: DropdownState::Closed,
        }
    }

    /// Department picker with `selected` chosen.
    pub fn departments(selected: Department) -> Self {
        let options = Department::labels().into_iter().map(String::from).collect();
        Self::new(options, Some(selected.label().to_string()))
            .with_placeholder("Select Service")
    }

    /// Gender picker with `selected` chosen.
    pub fn genders(selected: &str) -> Self {
        let options = GENDER_OPTIONS.iter().map(|g| g.to_string()).collect();
        Self::new(options, Some(selected.to_string())).with_placeholder("Select Gender")
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn state(&self) -> DropdownState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DropdownState::Open
    }

    pub fn is_selected(&self, option: &str) -> bool {
        self.value.as_deref() == Some(option)
    }

    /// Text shown on the closed control.
    pub fn display_text(&self) -> &str {
        self.value
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(self.placeholder.as_deref())
            .unwrap_or(FALLBACK_PLACEHOLDER)
    }

    /// Click on the control itself.
    pub fn toggle(&mut self) {
        self.state = match self.state {
            DropdownState::Closed => DropdownState::Open,
            DropdownState::Open => DropdownState::Closed,
        };
    }

    pub fn close(&mut self) {
        self.state = DropdownState::Closed;
    }

    /// Choose an option and close. Returns the new value for the change
    /// handler, or `None` if `option` is not offered.
    pub fn select(&mut self, option: &str) -> Option<String> {
        if !self.options.iter().any(|o| o == option) {
            return None;
        }
        self.value = Some(option.to_string());
        self.close();
        self.value.clone()
    }

    /// Pointer pressed somewhere on screen. Closes the dropdown if the press
    /// landed outside `bounds`; returns whether it was dismissed.
    pub fn pointer_down<B: PointerBounds>(&mut self, bounds: &B, point: Point) -> bool {
        if self.is_open() && !bounds.contains(point) {
            self.close();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Rect = Rect {
        x: 10.0,
        y: 10.0,
        width: 200.0,
        height: 40.0,
    };

    #[test]
    fn test_toggle_and_select() {
        let mut dropdown = Dropdown::departments(Department::GeneralConsultation);
        assert!(!dropdown.is_open());

        dropdown.toggle();
        assert!(dropdown.is_open());

        assert_eq!(dropdown.select("Dental"), Some("Dental".to_string()));
        assert!(!dropdown.is_open());
        assert!(dropdown.is_selected("Dental"));
        assert_eq!(dropdown.display_text(), "Dental");
    }

    #[test]
    fn test_select_unknown_option() {
        let mut dropdown = Dropdown::genders("Male");
        dropdown.toggle();
        assert_eq!(dropdown.select("Unknown"), None);
        assert!(dropdown.is_open());
        assert_eq!(dropdown.value(), Some("Male"));
    }

    #[test]
    fn test_outside_press_dismisses() {
        let mut dropdown = Dropdown::genders("Male");
        dropdown.toggle();

        assert!(!dropdown.pointer_down(&BOUNDS, Point { x: 50.0, y: 20.0 }));
        assert!(dropdown.is_open());

        assert!(dropdown.pointer_down(&BOUNDS, Point { x: 300.0, y: 20.0 }));
        assert_eq!(dropdown.state(), DropdownState::Closed);

        // Already closed: nothing to dismiss
        assert!(!dropdown.pointer_down(&BOUNDS, Point { x: 300.0, y: 20.0 }));
    }

    #[test]
    fn test_placeholder_text() {
        let dropdown = Dropdown::new(vec!["A".into()], None);
        assert_eq!(dropdown.display_text(), "Select option");

        let dropdown = Dropdown::new(vec!["A".into()], Some(String::new())).with_placeholder("Pick");
        assert_eq!(dropdown.display_text(), "Pick");
    }
}
