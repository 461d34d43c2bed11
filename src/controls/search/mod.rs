mod machine;

pub use machine::{
    ControlState, Effect, Recenter, SearchFailure, SearchInput, SearchMachine, Token, DEBOUNCE,
    MIN_QUERY_LEN, SELECTION_ZOOM,
};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::geocoder::{Geocoder, SearchResult};

/// Address search box bound to a geocoder
///
/// Timers and requests run as tokio tasks that report back through
/// `events`; the owner feeds every received message to
/// [`SearchControl::on_message`].
pub struct SearchControl {
    machine: SearchMachine,
    geocoder: Arc<dyn Geocoder>,
    events: mpsc::Sender<SearchInput>,
    text: String,
    focused: bool,
    highlighted: usize,
    timer: Option<JoinHandle<()>>,
    request: Option<JoinHandle<()>>,
}

impl SearchControl {
    pub fn new(geocoder: Arc<dyn Geocoder>, events: mpsc::Sender<SearchInput>) -> Self {
        Self {
            machine: SearchMachine::new(),
            geocoder,
            events,
            text: String::new(),
            focused: false,
            highlighted: 0,
            timer: None,
            request: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> &ControlState {
        self.machine.state()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Visible results, empty unless the result panel shows matches
    pub fn results(&self) -> &[SearchResult] {
        match self.machine.state() {
            ControlState::ShowingResults(results) => results,
            _ => &[],
        }
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn highlight_next(&mut self) {
        let len = self.results().len();
        if len > 0 {
            self.highlighted = (self.highlighted + 1) % len;
        }
    }

    pub fn highlight_prev(&mut self) {
        let len = self.results().len();
        if len > 0 {
            self.highlighted = (self.highlighted + len - 1) % len;
        }
    }

    pub fn type_char(&mut self, c: char) {
        self.text.push(c);
        self.dispatch(SearchInput::Keystroke(self.text.clone()));
    }

    pub fn backspace(&mut self) {
        if self.text.pop().is_some() {
            self.dispatch(SearchInput::Keystroke(self.text.clone()));
        }
    }

    /// Enter key: pick the highlighted result when the list is open,
    /// otherwise search immediately
    pub fn submit(&mut self) -> Option<Recenter> {
        if self.results().is_empty() {
            self.dispatch(SearchInput::Submit(self.text.clone()))
        } else {
            self.select(self.highlighted)
        }
    }

    pub fn select(&mut self, index: usize) -> Option<Recenter> {
        let recenter = self.dispatch(SearchInput::Select(index));
        if recenter.is_some() {
            self.focused = false;
        }
        recenter
    }

    /// Click or Esc outside the control
    pub fn outside_click(&mut self) {
        self.focused = false;
        self.dispatch(SearchInput::OutsideClick);
    }

    /// Deliver a timer or response message produced by this control's tasks
    pub fn on_message(&mut self, input: SearchInput) -> Option<Recenter> {
        self.dispatch(input)
    }

    fn dispatch(&mut self, input: SearchInput) -> Option<Recenter> {
        let was_open = self.machine.state().is_open();
        let mut recenter = None;

        for effect in self.machine.handle(input) {
            match effect {
                Effect::StartTimer { token, delay } => self.start_timer(token, delay),
                Effect::CancelTimer => abort(&mut self.timer),
                Effect::Request { token, query } => self.start_request(token, query),
                Effect::CancelRequest => abort(&mut self.request),
                Effect::Recenter(r) => recenter = Some(r),
            }
        }

        if !was_open || !self.machine.state().is_open() {
            self.highlighted = 0;
        }
        recenter
    }

    fn start_timer(&mut self, token: Token, delay: Duration) {
        abort(&mut self.timer);
        let events = self.events.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SearchInput::TimerElapsed(token)).await;
        }));
    }

    fn start_request(&mut self, token: Token, query: String) {
        abort(&mut self.request);
        info!(query, "Searching address");
        let geocoder = Arc::clone(&self.geocoder);
        let events = self.events.clone();
        self.request = Some(tokio::spawn(async move {
            let outcome = geocoder.search(&query).await;
            let _ = events.send(SearchInput::Response { token, outcome }).await;
        }));
    }
}

fn abort(task: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = task.take() {
        debug!("Cancelling search task");
        handle.abort();
    }
}

impl Drop for SearchControl {
    fn drop(&mut self) {
        abort(&mut self.timer);
        abort(&mut self.request);
    }
}
