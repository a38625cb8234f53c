use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CommandExecutor, CommandOutput, ExecError};

type Reply = Result<CommandOutput, ExecError>;

struct Rule {
    pattern: String,
    replies: VecDeque<Reply>,
}

/// Test executor that answers from canned replies.
///
/// A rule matches when its pattern is a substring of the rendered command
/// line. Replies are consumed in order and the last one repeats forever.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "a rule needs at least one reply");
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            replies: replies.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.contains(pattern))
            .count()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ExecError> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|rule| line.contains(&rule.pattern))
            .unwrap_or_else(|| panic!("no scripted reply for `{line}`"));

        if rule.replies.len() > 1 {
            rule.replies.pop_front().unwrap()
        } else {
            rule.replies.front().cloned().unwrap()
        }
    }
}
