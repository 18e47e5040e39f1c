//! Callbacks for messages and yes/no questions raised during bulk operations
//!
//! Both are optional everywhere they are accepted. A missing [`Reporter`]
//! routes messages to the log; a missing [`Asker`] answers yes.

/// One-way sink for human-readable notices
pub trait Reporter {
    fn report(&mut self, message: &str);
}

impl Reporter for Vec<String> {
    fn report(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Source of answers to yes/no questions
pub trait Asker {
    fn ask(&mut self, question: &str) -> bool;
}

impl<F> Asker for F
where
    F: FnMut(&str) -> bool,
{
    fn ask(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// Send a message to `reporter`, or to the log if there is none
pub fn report(reporter: &mut Option<&mut dyn Reporter>, message: &str) {
    match reporter {
        Some(r) => r.report(message),
        None => log::info!("{}", message),
    }
}

/// Ask `asker`, answering yes if there is none
pub fn ask(asker: &mut Option<&mut dyn Asker>, question: &str) -> bool {
    match asker {
        Some(a) => a.ask(question),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_reporter() {
        let mut lines: Vec<String> = Vec::new();
        {
            let mut sink: Option<&mut dyn Reporter> = Some(&mut lines);
            report(&mut sink, "first");
            report(&mut sink, "second");
        }
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_missing_reporter_is_safe() {
        let mut sink: Option<&mut dyn Reporter> = None;
        report(&mut sink, "nobody listens");
    }

    #[test]
    fn test_asker_defaults_to_yes() {
        let mut none: Option<&mut dyn Asker> = None;
        assert!(ask(&mut none, "Overwrite?"));

        let mut asked = Vec::new();
        let mut refuse = |q: &str| {
            asked.push(q.to_string());
            false
        };
        let mut some: Option<&mut dyn Asker> = Some(&mut refuse);
        assert!(!ask(&mut some, "Overwrite?"));
        drop(some);
        assert_eq!(asked, vec!["Overwrite?"]);
    }
}
