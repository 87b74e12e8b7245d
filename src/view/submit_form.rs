//! Public company submission form.

use crate::dom::{Dom, ElementId};
use crate::error::{HydrateError, ValidationError};
use crate::event::{dispatch, Event, EventChannel, FormSubmit};
use crate::resource::SubmitFormData;
use crate::router::{Router, RouterState};
use crate::view::{assert_class, Disposable, Hydratable, Mountable, StateAnchor};

const INPUT_NAME: &str = "name";
const INPUT_HOMEPAGE: &str = "homepage";
const INPUT_EMAIL: &str = "email";
const INPUT_SUBMITTER: &str = "submitterName";

/// `<form>` asking for a company name, homepage and submitter details.
///
/// The form validates itself before any `submit` listener runs: invalid data
/// cancels the event, so listeners see `default_prevented()`.
#[derive(Debug)]
pub struct SubmitForm {
    outer: ElementId,
    name: ElementId,
    homepage: ElementId,
    email: ElementId,
    submitter_name: ElementId,
    submitter: ElementId,
    validation_message: ElementId,
    exception_message: ElementId,
    thanks: ElementId,
    pub submit: EventChannel<FormSubmit>,
}

impl SubmitForm {
    /// `show_submitter` is false when a user is logged in.
    pub fn create(dom: &mut Dom, csrf_token: Option<&str>, show_submitter: bool) -> Self {
        let outer = dom.create("form", Some(Self::CLASS));
        dom.set_attr(outer, "method", "post");

        let csrf = dom.create("input", Some("csrfToken"));
        dom.set_attr(csrf, "type", "hidden");
        dom.set_attr(csrf, "name", "_csrf");
        dom.set_attr(csrf, "value", csrf_token.unwrap_or_default());
        dom.append_child(outer, csrf);

        let name = text_input(dom, outer, INPUT_NAME);
        let homepage = text_input(dom, outer, INPUT_HOMEPAGE);

        let submitter = dom.create("div", Some("submitter"));
        dom.append_child(outer, submitter);
        let email = text_input(dom, submitter, INPUT_EMAIL);
        let submitter_name = text_input(dom, submitter, INPUT_SUBMITTER);
        dom.toggle_class(submitter, "hidden", !show_submitter);

        let validation_message = dom.create("p", Some("validationMessage"));
        let exception_message = dom.create("p", Some("exceptionMessage"));
        let thanks = dom.create("div", Some("thanks"));
        dom.add_class(thanks, "hidden");
        dom.append_child(outer, validation_message);
        dom.append_child(outer, exception_message);
        dom.append_child(outer, thanks);

        Self {
            outer,
            name,
            homepage,
            email,
            submitter_name,
            submitter,
            validation_message,
            exception_message,
            thanks,
            submit: EventChannel::new(),
        }
    }

    pub fn set_action(&self, dom: &mut Dom, action: impl Into<String>) {
        dom.set_attr(self.outer, "action", action);
    }

    pub fn action<'a>(&self, dom: &'a Dom) -> Option<&'a str> {
        dom.attr(self.outer, "action")
    }

    pub fn shows_submitter(&self, dom: &Dom) -> bool {
        !dom.has_class(self.submitter, "hidden")
    }

    pub fn set_all(&self, dom: &mut Dom, data: &SubmitFormData) {
        dom.set_attr(self.name, "value", data.name.as_str());
        dom.set_attr(self.homepage, "value", data.homepage.as_str());
        dom.set_attr(self.email, "value", data.email.as_str());
        dom.set_attr(self.submitter_name, "value", data.submitter_name.as_str());
    }

    pub fn get_all(&self, dom: &Dom) -> SubmitFormData {
        let value = |el| dom.attr(el, "value").unwrap_or_default().trim().to_string();
        SubmitFormData {
            name: value(self.name),
            homepage: value(self.homepage),
            email: value(self.email),
            submitter_name: value(self.submitter_name),
        }
    }

    /// Check the current input. With `report`, the first problem is shown on the form.
    pub fn validate(&self, dom: &mut Dom, report: bool) -> Result<(), ValidationError> {
        let result = validate_data(&self.get_all(dom));
        if report {
            let message = match &result {
                Ok(()) => String::new(),
                Err(e) => e.to_string(),
            };
            dom.set_text(self.validation_message, message);
        }
        result
    }

    /// Mark that a submit was attempted so invalid inputs are highlighted.
    pub fn mark_attempted(&self, dom: &mut Dom) {
        dom.add_class(self.outer, "attemptedSubmit");
    }

    pub fn set_busy(&self, dom: &mut Dom, busy: bool) {
        dom.toggle_class(self.outer, "busy", busy);
    }

    pub fn is_busy(&self, dom: &Dom) -> bool {
        dom.has_class(self.outer, "busy")
    }

    /// Replace the form content with a thank-you note linking back to `fader_state`.
    pub fn show_thanks(&self, dom: &mut Dom, router: &dyn Router, fader_state: &RouterState) {
        self.set_busy(dom, false);
        dom.set_text(self.thanks, "Thank you for your submission!");
        let back = StateAnchor::create(dom, router, fader_state.clone(), "close");
        back.mount(dom, self.thanks);
        dom.toggle_class(self.thanks, "hidden", false);
        dom.add_class(self.outer, "submitted");
    }

    pub fn thanks_shown(&self, dom: &Dom) -> bool {
        !dom.has_class(self.thanks, "hidden")
    }

    pub fn set_exception_message(&self, dom: &mut Dom, message: &str) {
        dom.set_text(self.exception_message, message);
    }

    pub fn exception_message(&self, dom: &Dom) -> String {
        dom.text(self.exception_message)
    }

    /// Deliver a submit gesture: validate first, then notify listeners.
    pub fn emit_submit(&self, dom: &mut Dom, event: &mut Event<FormSubmit>) {
        self.mark_attempted(dom);
        if self.validate(dom, true).is_err() {
            event.prevent_default();
        }
        dispatch(event, &[&self.submit]);
    }
}

fn text_input(dom: &mut Dom, parent: ElementId, name: &'static str) -> ElementId {
    let input = dom.create("input", Some(name));
    dom.set_attr(input, "type", "text");
    dom.set_attr(input, "name", name);
    dom.set_attr(input, "value", "");
    dom.append_child(parent, input);
    input
}

/// Rules for a public submission.
pub fn validate_data(data: &SubmitFormData) -> Result<(), ValidationError> {
    if data.name.is_empty() {
        return Err(ValidationError::Required("name"));
    }
    if data.homepage.is_empty() {
        return Err(ValidationError::Required("homepage"));
    }
    if data.homepage.contains(char::is_whitespace) || !data.homepage.contains('.') {
        return Err(ValidationError::InvalidHomepage(data.homepage.clone()));
    }
    if !data.email.is_empty() {
        let valid = match data.email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
            None => false,
        };
        if !valid {
            return Err(ValidationError::InvalidEmail(data.email.clone()));
        }
    }
    Ok(())
}

impl Mountable for SubmitForm {
    fn outer(&self) -> ElementId {
        self.outer
    }
}

impl Disposable for SubmitForm {}

impl Hydratable for SubmitForm {
    const CLASS: &'static str = "SubmitForm";

    fn hydrate(dom: &Dom, outer: ElementId) -> Result<Self, HydrateError> {
        assert_class(dom, outer, Self::CLASS)?;
        let submitter = dom.assert_path(outer, &["submitter"])?;
        Ok(Self {
            outer,
            name: dom.assert_path(outer, &[INPUT_NAME])?,
            homepage: dom.assert_path(outer, &[INPUT_HOMEPAGE])?,
            email: dom.assert_path(submitter, &[INPUT_EMAIL])?,
            submitter_name: dom.assert_path(submitter, &[INPUT_SUBMITTER])?,
            submitter,
            validation_message: dom.assert_path(outer, &["validationMessage"])?,
            exception_message: dom.assert_path(outer, &["exceptionMessage"])?,
            thanks: dom.assert_path(outer, &["thanks"])?,
            submit: EventChannel::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn data() -> SubmitFormData {
        SubmitFormData {
            name: "Acme".into(),
            homepage: "acme.example".into(),
            email: "jane@acme.example".into(),
            submitter_name: "Jane".into(),
        }
    }

    #[test]
    fn validation_rules() {
        assert!(validate_data(&data()).is_ok());

        let mut d = data();
        d.name.clear();
        assert_eq!(validate_data(&d), Err(ValidationError::Required("name")));

        let mut d = data();
        d.homepage = "not a url".into();
        assert!(matches!(validate_data(&d), Err(ValidationError::InvalidHomepage(_))));

        let mut d = data();
        d.email = "jane".into();
        assert!(matches!(validate_data(&d), Err(ValidationError::InvalidEmail(_))));

        let mut d = data();
        d.email.clear();
        assert!(validate_data(&d).is_ok());
    }

    #[test]
    fn invalid_input_cancels_submit_before_listeners() {
        let mut dom = Dom::new();
        let mut form = SubmitForm::create(&mut dom, Some("tok"), true);
        let prevented = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&prevented);
        form.submit.on(move |e| {
            if e.default_prevented() {
                p.fetch_add(1, Ordering::SeqCst);
            }
        });

        let mut event = Event::new(FormSubmit);
        form.emit_submit(&mut dom, &mut event);
        assert!(event.default_prevented());
        assert_eq!(prevented.load(Ordering::SeqCst), 1);
        assert_eq!(dom.text(form.validation_message), "name is required");

        form.set_all(&mut dom, &data());
        let mut event = Event::new(FormSubmit);
        form.emit_submit(&mut dom, &mut event);
        assert!(!event.default_prevented());
    }

    #[test]
    fn round_trips_data_and_hydrates() {
        let mut dom = Dom::new();
        let form = SubmitForm::create(&mut dom, None, false);
        form.set_all(&mut dom, &data());
        assert_eq!(form.get_all(&dom), data());
        assert!(!form.shows_submitter(&dom));

        let hydrated = SubmitForm::hydrate(&dom, form.outer()).unwrap();
        assert_eq!(hydrated.get_all(&dom), data());
    }
}
