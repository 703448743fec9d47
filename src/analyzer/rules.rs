//! Ordered rule tables. Within a table the first rule whose predicate holds
//! decides the outcome; tables that must be total end with [`always`].

use crate::types::{AxisId, AxisReport, Signal};

/// One row of an axis rule table
pub struct Rule<I> {
    pub name: &'static str,
    pub when: fn(&I) -> bool,
    pub signal: Signal,
    /// Trigger-line text; only rendered for active signals
    pub trigger: Option<fn(&I) -> String>,
    /// Conclusion text
    pub explain: fn(&I) -> String,
}

impl<I> Rule<I> {
    pub fn matches(&self, input: &I) -> bool {
        (self.when)(input)
    }

    pub fn trigger_text(&self, input: &I) -> Option<String> {
        self.trigger.map(|f| f(input))
    }

    pub fn report(&self, axis: AxisId, input: &I) -> AxisReport {
        let text = self.trigger_text(input);
        let (positive, negative) = match self.signal {
            Signal::Positive => (text, None),
            Signal::Negative => (None, text),
            _ => (None, None),
        };
        AxisReport {
            axis,
            signal: self.signal,
            positive,
            negative,
            conclusion: (self.explain)(input),
        }
    }
}

/// Catch-all predicate for the last row of a table
pub fn always<I>(_: &I) -> bool {
    true
}

pub fn first_match<'r, I>(rules: &'r [Rule<I>], input: &I) -> Option<&'r Rule<I>> {
    rules.iter().find(|rule| rule.matches(input))
}

/// Evaluate a total table. A table without a matching row still classifies,
/// as inactive.
pub fn classify<I>(axis: AxisId, rules: &[Rule<I>], input: &I) -> AxisReport {
    match first_match(rules, input) {
        Some(rule) => {
            tracing::debug!(axis = %axis, rule = rule.name, "Axis rule matched");
            rule.report(axis, input)
        }
        None => AxisReport {
            axis,
            signal: Signal::Inactive,
            positive: None,
            negative: None,
            conclusion: format!("{}: {} normal", axis, axis.title()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[Rule<i32>] = &[
        Rule {
            name: "big",
            when: |v| *v > 10,
            signal: Signal::Negative,
            trigger: Some(|v| format!("big {}", v)),
            explain: |_| "big".to_string(),
        },
        Rule {
            name: "positive",
            when: |v| *v > 0,
            signal: Signal::Positive,
            trigger: Some(|v| format!("pos {}", v)),
            explain: |_| "positive".to_string(),
        },
    ];

    #[test]
    fn earlier_rows_win() {
        let report = classify(AxisId::A, TABLE, &20);
        assert_eq!(report.signal, Signal::Negative);
        assert_eq!(report.negative.as_deref(), Some("big 20"));
        assert_eq!(report.positive, None);

        let report = classify(AxisId::A, TABLE, &5);
        assert_eq!(report.signal, Signal::Positive);
        assert_eq!(report.positive.as_deref(), Some("pos 5"));
    }

    #[test]
    fn unmatched_input_is_inactive() {
        let report = classify(AxisId::C, TABLE, &-1);
        assert_eq!(report.signal, Signal::Inactive);
        assert_eq!(report.conclusion, "C: repo spread normal");
    }
}
