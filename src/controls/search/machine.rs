use std::time::Duration;

use tracing::debug;

use crate::error::GeocodeError;
use crate::geo::{project, Coord, LonLat};
use crate::geocoder::SearchResult;

/// Queries shorter than this never reach the provider
pub const MIN_QUERY_LEN: usize = 4;

/// Quiet period after the last keystroke before searching
pub const DEBOUNCE: Duration = Duration::from_millis(700);

/// Zoom level applied when a result is selected
pub const SELECTION_ZOOM: f64 = 14.0;

/// Identifies one issued timer or request; only the latest may update state
pub type Token = u64;

/// Failure shown to the user as a single error entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFailure {
    Unreachable,
    NotFound,
}

impl SearchFailure {
    pub fn message(&self) -> &'static str {
        match self {
            SearchFailure::Unreachable => "Cannot reach the address search service",
            SearchFailure::NotFound => "Place not found",
        }
    }
}

/// State of the address search control
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ControlState {
    #[default]
    Idle,
    /// Debounce timer running for `query`
    Pending { token: Token, query: String },
    /// Request in flight
    Searching { token: Token },
    ShowingResults(Vec<SearchResult>),
    ShowingError(SearchFailure),
}

impl ControlState {
    /// Whether the result panel is open
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ControlState::ShowingResults(_) | ControlState::ShowingError(_)
        )
    }
}

/// Something that happened to the control
#[derive(Debug, Clone, PartialEq)]
pub enum SearchInput {
    /// Input text changed; carries the full current text
    Keystroke(String),
    /// Form submitted with the current text
    Submit(String),
    TimerElapsed(Token),
    Response {
        token: Token,
        outcome: Result<Vec<SearchResult>, GeocodeError>,
    },
    /// Click anywhere outside the control
    OutsideClick,
    /// Result at this index chosen
    Select(usize),
}

/// New view position requested by a selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recenter {
    pub center: Coord,
    pub zoom: f64,
}

/// Work the driver must carry out after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartTimer { token: Token, delay: Duration },
    CancelTimer,
    Request { token: Token, query: String },
    CancelRequest,
    Recenter(Recenter),
}

/// Transition logic of the address search control
///
/// Every keystroke, submit and outside click issues a new token; timer and
/// response events carrying an older token are dropped, which is what
/// makes a superseded request unable to touch the visible state.
#[derive(Debug, Default)]
pub struct SearchMachine {
    state: ControlState,
    latest: Token,
}

impl SearchMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn latest_token(&self) -> Token {
        self.latest
    }

    /// Apply one input, returning the effects to perform in order
    pub fn handle(&mut self, input: SearchInput) -> Vec<Effect> {
        match input {
            SearchInput::Keystroke(text) => {
                let mut effects = self.supersede();
                let query = text.trim();
                if query.chars().count() >= MIN_QUERY_LEN {
                    let token = self.latest;
                    self.state = ControlState::Pending {
                        token,
                        query: query.to_string(),
                    };
                    effects.push(Effect::StartTimer {
                        token,
                        delay: DEBOUNCE,
                    });
                } else {
                    self.state = ControlState::Idle;
                }
                effects
            }

            SearchInput::Submit(text) => {
                let mut effects = self.supersede();
                let query = text.trim();
                if query.is_empty() {
                    self.state = ControlState::Idle;
                } else {
                    let token = self.latest;
                    self.state = ControlState::Searching { token };
                    effects.push(Effect::Request {
                        token,
                        query: query.to_string(),
                    });
                }
                effects
            }

            SearchInput::TimerElapsed(token) => match &self.state {
                ControlState::Pending { token: current, query } if *current == token => {
                    let query = query.clone();
                    self.state = ControlState::Searching { token };
                    vec![Effect::Request { token, query }]
                }
                _ => {
                    debug!(token, "Dropping stale timer");
                    Vec::new()
                }
            },

            SearchInput::Response { token, outcome } => match self.state {
                ControlState::Searching { token: current } if current == token => {
                    self.state = match outcome {
                        Ok(results) if !results.is_empty() => ControlState::ShowingResults(results),
                        Ok(_) => ControlState::ShowingError(SearchFailure::NotFound),
                        Err(e) => {
                            debug!(error = %e, "Address search failed");
                            ControlState::ShowingError(SearchFailure::Unreachable)
                        }
                    };
                    Vec::new()
                }
                _ => {
                    debug!(token, "Dropping superseded response");
                    Vec::new()
                }
            },

            SearchInput::OutsideClick => {
                let effects = self.supersede();
                self.state = ControlState::Idle;
                effects
            }

            SearchInput::Select(index) => {
                let ControlState::ShowingResults(results) = &self.state else {
                    return Vec::new();
                };
                let Some(result) = results.get(index) else {
                    return Vec::new();
                };

                let recenter = Recenter {
                    center: project(LonLat::new(result.x, result.y)),
                    zoom: SELECTION_ZOOM,
                };
                let effects = self.supersede();
                self.state = ControlState::Idle;
                effects.into_iter().chain([Effect::Recenter(recenter)]).collect()
            }
        }
    }

    /// Issue a new token and cancel whatever the current state is waiting on
    fn supersede(&mut self) -> Vec<Effect> {
        self.latest += 1;
        match self.state {
            ControlState::Pending { .. } => vec![Effect::CancelTimer],
            ControlState::Searching { .. } => vec![Effect::CancelRequest],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Vec<SearchResult> {
        vec![SearchResult {
            label: "Paris, France".to_string(),
            x: 2.3,
            y: 48.9,
        }]
    }

    /// Type `text` one character at a time, collecting every effect
    fn type_text(machine: &mut SearchMachine, text: &str) -> Vec<Effect> {
        let mut typed = String::new();
        let mut effects = Vec::new();
        for c in text.chars() {
            typed.push(c);
            effects.extend(machine.handle(SearchInput::Keystroke(typed.clone())));
        }
        effects
    }

    fn searching_token(machine: &SearchMachine) -> Token {
        match machine.state() {
            ControlState::Searching { token } => *token,
            other => panic!("expected searching, got {other:?}"),
        }
    }

    #[test]
    fn test_three_characters_issue_nothing() {
        let mut machine = SearchMachine::new();
        let effects = type_text(&mut machine, "Par");
        assert!(effects.is_empty());
        assert_eq!(machine.state(), &ControlState::Idle);
    }

    #[test]
    fn test_fourth_character_starts_timer() {
        let mut machine = SearchMachine::new();
        let effects = type_text(&mut machine, "Pari");
        assert_eq!(
            effects,
            vec![Effect::StartTimer {
                token: machine.latest_token(),
                delay: DEBOUNCE
            }]
        );
    }

    #[test]
    fn test_fifth_character_restarts_timer() {
        let mut machine = SearchMachine::new();
        type_text(&mut machine, "Pari");
        let first = machine.latest_token();

        let effects = machine.handle(SearchInput::Keystroke("Paris".to_string()));
        let second = machine.latest_token();
        assert_ne!(first, second);
        assert_eq!(
            effects,
            vec![
                Effect::CancelTimer,
                Effect::StartTimer {
                    token: second,
                    delay: DEBOUNCE
                }
            ]
        );

        // The first timer firing late does nothing
        assert!(machine.handle(SearchInput::TimerElapsed(first)).is_empty());

        let effects = machine.handle(SearchInput::TimerElapsed(second));
        assert_eq!(
            effects,
            vec![Effect::Request {
                token: second,
                query: "Paris".to_string()
            }]
        );
    }

    #[test]
    fn test_burst_issues_one_request() {
        let mut machine = SearchMachine::new();
        let mut effects = type_text(&mut machine, "Marseille");

        let tokens: Vec<Token> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::StartTimer { token, .. } => Some(*token),
                _ => None,
            })
            .collect();
        for token in tokens {
            effects.extend(machine.handle(SearchInput::TimerElapsed(token)));
        }

        let requests = effects
            .iter()
            .filter(|e| matches!(e, Effect::Request { .. }))
            .count();
        assert_eq!(requests, 1);
    }

    #[test]
    fn test_submit_bypasses_debounce() {
        let mut machine = SearchMachine::new();
        type_text(&mut machine, "Paris");
        let pending = machine.latest_token();

        let effects = machine.handle(SearchInput::Submit("Paris".to_string()));
        let token = searching_token(&machine);
        assert_eq!(
            effects,
            vec![
                Effect::CancelTimer,
                Effect::Request {
                    token,
                    query: "Paris".to_string()
                }
            ]
        );

        // The superseded timer elapsing issues no extra request
        assert!(machine.handle(SearchInput::TimerElapsed(pending)).is_empty());
        assert_eq!(searching_token(&machine), token);
    }

    #[test]
    fn test_submit_short_text_is_allowed_but_empty_is_not() {
        let mut machine = SearchMachine::new();
        let effects = machine.handle(SearchInput::Submit("Aix".to_string()));
        assert!(matches!(effects.as_slice(), [Effect::Request { .. }]));

        let effects = machine.handle(SearchInput::Submit("   ".to_string()));
        assert_eq!(effects, vec![Effect::CancelRequest]);
        assert_eq!(machine.state(), &ControlState::Idle);
    }

    #[test]
    fn test_response_outcomes() {
        let mut machine = SearchMachine::new();

        machine.handle(SearchInput::Submit("Paris".to_string()));
        let token = searching_token(&machine);
        machine.handle(SearchInput::Response {
            token,
            outcome: Ok(results()),
        });
        assert_eq!(machine.state(), &ControlState::ShowingResults(results()));

        machine.handle(SearchInput::Submit("xyzzy123".to_string()));
        let token = searching_token(&machine);
        machine.handle(SearchInput::Response {
            token,
            outcome: Ok(Vec::new()),
        });
        assert_eq!(
            machine.state(),
            &ControlState::ShowingError(SearchFailure::NotFound)
        );

        machine.handle(SearchInput::Submit("Paris".to_string()));
        let token = searching_token(&machine);
        machine.handle(SearchInput::Response {
            token,
            outcome: Err(GeocodeError::Unreachable("refused".to_string())),
        });
        assert_eq!(
            machine.state(),
            &ControlState::ShowingError(SearchFailure::Unreachable)
        );
    }

    #[test]
    fn test_late_response_is_discarded() {
        let mut machine = SearchMachine::new();
        machine.handle(SearchInput::Submit("Lyon".to_string()));
        let old = searching_token(&machine);

        let effects = machine.handle(SearchInput::Submit("Lille".to_string()));
        assert_eq!(effects[0], Effect::CancelRequest);
        let current = searching_token(&machine);

        // Old answer arrives first and must not show
        machine.handle(SearchInput::Response {
            token: old,
            outcome: Ok(results()),
        });
        assert_eq!(machine.state(), &ControlState::Searching { token: current });

        machine.handle(SearchInput::Response {
            token: current,
            outcome: Ok(Vec::new()),
        });
        assert_eq!(
            machine.state(),
            &ControlState::ShowingError(SearchFailure::NotFound)
        );
    }

    #[test]
    fn test_outside_click_closes_and_cancels() {
        let mut machine = SearchMachine::new();
        machine.handle(SearchInput::Submit("Paris".to_string()));
        let token = searching_token(&machine);

        let effects = machine.handle(SearchInput::OutsideClick);
        assert_eq!(effects, vec![Effect::CancelRequest]);
        assert_eq!(machine.state(), &ControlState::Idle);

        // Nothing can resume the cancelled search
        machine.handle(SearchInput::Response {
            token,
            outcome: Ok(results()),
        });
        assert_eq!(machine.state(), &ControlState::Idle);

        machine.handle(SearchInput::Submit("Paris".to_string()));
        let token = searching_token(&machine);
        machine.handle(SearchInput::Response {
            token,
            outcome: Ok(results()),
        });
        assert!(machine.state().is_open());
        machine.handle(SearchInput::OutsideClick);
        assert!(!machine.state().is_open());
    }

    #[test]
    fn test_select_recenters_and_closes() {
        let mut machine = SearchMachine::new();
        machine.handle(SearchInput::Submit("Paris".to_string()));
        let token = searching_token(&machine);
        machine.handle(SearchInput::Response {
            token,
            outcome: Ok(results()),
        });

        let effects = machine.handle(SearchInput::Select(0));
        assert_eq!(
            effects,
            vec![Effect::Recenter(Recenter {
                center: project(LonLat::new(2.3, 48.9)),
                zoom: SELECTION_ZOOM
            })]
        );
        assert_eq!(machine.state(), &ControlState::Idle);
    }

    #[test]
    fn test_select_out_of_range_or_closed_is_ignored() {
        let mut machine = SearchMachine::new();
        assert!(machine.handle(SearchInput::Select(0)).is_empty());

        machine.handle(SearchInput::Submit("Paris".to_string()));
        let token = searching_token(&machine);
        machine.handle(SearchInput::Response {
            token,
            outcome: Ok(results()),
        });
        assert!(machine.handle(SearchInput::Select(3)).is_empty());
        assert!(machine.state().is_open());
    }

    #[test]
    fn test_short_keystroke_cancels_pending() {
        let mut machine = SearchMachine::new();
        type_text(&mut machine, "Nantes");
        let effects = machine.handle(SearchInput::Keystroke("Nan".to_string()));
        assert_eq!(effects, vec![Effect::CancelTimer]);
        assert_eq!(machine.state(), &ControlState::Idle);
    }
}
