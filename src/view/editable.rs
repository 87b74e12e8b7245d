//! Editable fields.
//!
//! An [`EditableField`] holds a displayed value plus the [`ChangeStamp`] of
//! the last change made by the user. Programmatic updates (initial render,
//! remote updates) go through `set_value` and leave the stamp alone, which is
//! what lets the change flusher tell local edits apart from pushed snapshots.

use crate::dom::{Dom, ElementId};
use crate::error::HydrateError;
use crate::resource::LogoFile;
use crate::view::{assert_class, Disposable, Hydratable, Mountable};
use dealport_collab::Operation;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Change stamps
// ============================================================================

static CLOCK: AtomicU64 = AtomicU64::new(1);

/// Process-wide logical time of a user change. Strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChangeStamp(u64);

impl ChangeStamp {
    /// Earlier than every stamp handed out by [`ChangeStamp::now`].
    pub const ZERO: ChangeStamp = ChangeStamp(0);

    pub fn now() -> Self {
        Self(CLOCK.fetch_add(1, Ordering::SeqCst))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Values
// ============================================================================

/// A value an editable field can hold.
pub trait FieldValue: Clone + PartialEq + Send {
    fn to_json(&self) -> Value;
}

impl FieldValue for String {
    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FieldValue for bool {
    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for Option<String> {
    fn to_json(&self) -> Value {
        match self {
            Some(s) => Value::String(s.clone()),
            None => Value::Null,
        }
    }
}

/// One changed field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Value(Value),
    /// A file chosen by the user; uploaded separately, never sent as an operation.
    File(LogoFile),
}

/// Fields changed since some stamp, keyed by record field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangedValues(BTreeMap<String, FieldChange>);

impl ChangedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_value(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), FieldChange::Value(value));
    }

    pub fn insert_file(&mut self, key: &str, file: LogoFile) {
        self.0.insert(key.to_string(), FieldChange::File(file));
    }

    /// Merge `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: ChangedValues) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &str) -> Option<&FieldChange> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `None` instead of an empty set.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }

    /// Remove and return the first file change, if any.
    pub fn take_file(&mut self) -> Option<LogoFile> {
        let key = self
            .0
            .iter()
            .find(|(_, change)| matches!(change, FieldChange::File(_)))
            .map(|(key, _)| key.clone())?;
        match self.0.remove(&key) {
            Some(FieldChange::File(file)) => Some(file),
            _ => None,
        }
    }

    /// One replace operation per value change, in key order. File changes are skipped.
    pub fn to_operations(&self) -> Vec<Operation> {
        self.0
            .iter()
            .filter_map(|(key, change)| match change {
                FieldChange::Value(value) => Some(Operation::replace_field(key.as_str(), value.clone())),
                FieldChange::File(_) => None,
            })
            .collect()
    }
}

// ============================================================================
// EditableField
// ============================================================================

/// A value plus the stamp of its last user change.
#[derive(Debug, Clone, PartialEq)]
pub struct EditableField<V> {
    value: V,
    changed_by_user: Option<ChangeStamp>,
}

impl<V: FieldValue> EditableField<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            changed_by_user: None,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Programmatic update. Does not mark the field as changed by the user.
    pub fn set_value(&mut self, value: V) {
        self.value = value;
    }

    /// User-initiated update. Stamps the change.
    pub fn user_set(&mut self, value: V) -> ChangeStamp {
        let stamp = ChangeStamp::now();
        self.value = value;
        self.changed_by_user = Some(stamp);
        stamp
    }

    pub fn last_user_change(&self) -> Option<ChangeStamp> {
        self.changed_by_user
    }

    pub fn is_changed_by_user_since(&self, since: ChangeStamp) -> bool {
        self.changed_by_user.is_some_and(|stamp| stamp >= since)
    }

    /// Add this field to `values` under `key` if it changed since `since`.
    pub fn collect_since(&self, key: &str, since: ChangeStamp, values: &mut ChangedValues) {
        if self.is_changed_by_user_since(since) {
            values.insert_value(key, self.value.to_json());
        }
    }
}

// ============================================================================
// EditablePlainText
// ============================================================================

/// A text field that is content-editable while in edit mode.
///
/// Single line fields collapse CR and LF to spaces; multiline fields keep
/// line breaks.
#[derive(Debug, Clone)]
pub struct EditablePlainText {
    outer: ElementId,
    multiline: bool,
    editing: bool,
    field: EditableField<String>,
}

impl EditablePlainText {
    pub fn create(dom: &mut Dom, tag: &str, multiline: bool, value: &str) -> Self {
        let outer = dom.create(tag, Some(Self::CLASS));
        dom.add_class(outer, if multiline { "multiline" } else { "singleline" });
        dom.set_attr(outer, "contenteditable", "false");
        let value = normalize(multiline, value);
        dom.set_text(outer, value.clone());
        Self {
            outer,
            multiline,
            editing: false,
            field: EditableField::new(value),
        }
    }

    pub fn value(&self) -> &str {
        self.field.value()
    }

    pub fn multiline(&self) -> bool {
        self.multiline
    }

    pub fn field(&self) -> &EditableField<String> {
        &self.field
    }

    pub fn set_value(&mut self, dom: &mut Dom, value: &str) {
        let value = normalize(self.multiline, value);
        dom.set_text(self.outer, value.clone());
        self.field.set_value(value);
    }

    /// Text typed or pasted by the user.
    pub fn user_input(&mut self, dom: &mut Dom, value: &str) -> ChangeStamp {
        let value = normalize(self.multiline, value);
        dom.set_text(self.outer, value.clone());
        self.field.user_set(value)
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    pub fn set_editing(&mut self, dom: &mut Dom, editing: bool) {
        self.editing = editing;
        dom.toggle_class(self.outer, "editing", editing);
        dom.set_attr(self.outer, "contenteditable", if editing { "true" } else { "false" });
    }
}

fn normalize(multiline: bool, value: &str) -> String {
    if multiline {
        value.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        value.replace(['\r', '\n'], " ")
    }
}

impl Mountable for EditablePlainText {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Disposable for EditablePlainText {}

impl Hydratable for EditablePlainText {
    const CLASS: &'static str = "EditablePlainText";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        Ok(Self {
            outer,
            multiline: dom.has_class(outer, "multiline"),
            editing: dom.has_class(outer, "editing"),
            field: EditableField::new(dom.text(outer)),
        })
    }
}

// ============================================================================
// EditableBooleanText
// ============================================================================

/// A toggle rendered as one of two labels.
#[derive(Debug, Clone)]
pub struct EditableBooleanText {
    outer: ElementId,
    false_label: String,
    true_label: String,
    editing: bool,
    field: EditableField<bool>,
}

impl EditableBooleanText {
    pub fn create(dom: &mut Dom, value: bool, false_label: &str, true_label: &str) -> Self {
        let outer = dom.create("span", Some(Self::CLASS));
        dom.set_attr(outer, "data-false-label", false_label);
        dom.set_attr(outer, "data-true-label", true_label);
        let mut this = Self {
            outer,
            false_label: false_label.to_string(),
            true_label: true_label.to_string(),
            editing: false,
            field: EditableField::new(value),
        };
        this.render(dom);
        this
    }

    fn render(&mut self, dom: &mut Dom) {
        let value = *self.field.value();
        dom.set_attr(self.outer, "data-value", if value { "true" } else { "false" });
        dom.toggle_class(self.outer, "on", value);
        let label = if value { &self.true_label } else { &self.false_label };
        dom.set_text(self.outer, label.clone());
    }

    pub fn value(&self) -> bool {
        *self.field.value()
    }

    pub fn field(&self) -> &EditableField<bool> {
        &self.field
    }

    pub fn set_value(&mut self, dom: &mut Dom, value: bool) {
        self.field.set_value(value);
        self.render(dom);
    }

    /// The user clicked the toggle.
    pub fn user_set(&mut self, dom: &mut Dom, value: bool) -> ChangeStamp {
        let stamp = self.field.user_set(value);
        self.render(dom);
        stamp
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    pub fn set_editing(&mut self, dom: &mut Dom, editing: bool) {
        self.editing = editing;
        dom.toggle_class(self.outer, "editing", editing);
    }
}

impl Mountable for EditableBooleanText {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Hydratable for EditableBooleanText {
    const CLASS: &'static str = "EditableBooleanText";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        let value = dom.attr(outer, "data-value") == Some("true");
        Ok(Self {
            outer,
            false_label: dom.attr(outer, "data-false-label").unwrap_or_default().to_string(),
            true_label: dom.attr(outer, "data-true-label").unwrap_or_default().to_string(),
            editing: dom.has_class(outer, "editing"),
            field: EditableField::new(value),
        })
    }
}

// ============================================================================
// EditableImage
// ============================================================================

/// An image whose source can be replaced by a file the user picks.
#[derive(Debug, Clone)]
pub struct EditableImage {
    outer: ElementId,
    editing: bool,
    src: Option<String>,
    pending: EditableField<Option<String>>,
    pending_file: Option<LogoFile>,
}

impl EditableImage {
    pub fn create(dom: &mut Dom, src: Option<&str>) -> Self {
        let outer = dom.create("img", Some(Self::CLASS));
        let mut this = Self {
            outer,
            editing: false,
            src: None,
            pending: EditableField::new(None),
            pending_file: None,
        };
        this.set_src(dom, src);
        this
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn set_src(&mut self, dom: &mut Dom, src: Option<&str>) {
        self.src = src.map(str::to_string);
        match src {
            Some(src) => dom.set_attr(self.outer, "src", src),
            None => dom.remove_attr(self.outer, "src"),
        }
    }

    /// The user picked a new image file.
    pub fn user_select_file(&mut self, dom: &mut Dom, file: LogoFile) -> ChangeStamp {
        dom.set_attr(self.outer, "data-pending", &file.file_name);
        let stamp = self.pending.user_set(Some(file.file_name.clone()));
        self.pending_file = Some(file);
        stamp
    }

    pub fn is_changed_by_user_since(&self, since: ChangeStamp) -> bool {
        self.pending.is_changed_by_user_since(since)
    }

    /// The file picked by the user, if picked at or after `since`.
    pub fn file_since(&self, since: ChangeStamp) -> Option<&LogoFile> {
        if self.is_changed_by_user_since(since) {
            self.pending_file.as_ref()
        } else {
            None
        }
    }

    pub fn set_editing(&mut self, dom: &mut Dom, editing: bool) {
        self.editing = editing;
        dom.toggle_class(self.outer, "editing", editing);
    }
}

impl Mountable for EditableImage {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Hydratable for EditableImage {
    const CLASS: &'static str = "EditableImage";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        Ok(Self {
            outer,
            editing: dom.has_class(outer, "editing"),
            src: dom.attr(outer, "src").map(str::to_string),
            pending: EditableField::new(None),
            pending_file: None,
        })
    }
}
