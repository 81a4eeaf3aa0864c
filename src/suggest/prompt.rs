//! Prompt assembly for the generator.

use crate::search::Match;

/// System role sent with every completion request.
pub const SYSTEM_PROMPT: &str = "You are an expert mental health advisor.";

/// One `Context:` / `Response:` block per match, in ranked order.
pub fn example_blocks(matches: &[Match]) -> String {
    matches
        .iter()
        .map(|m| format!("Context: {}\nResponse: {}\n\n", m.context, m.response))
        .collect()
}

/// Prompt grounded in retrieved examples.
pub fn grounded_prompt(query: &str, matches: &[Match]) -> String {
    format!(
        "You are a helpful mental health assistant.\n\n\
         User's challenge:\n{query}\n\n\
         Here are some relevant past context-response examples:\n{examples}\n\n\
         Based on the above, suggest the best way to help the patient.\n",
        query = query,
        examples = example_blocks(matches),
    )
}

/// Prompt used when no stored case passed the similarity floor.
pub fn fallback_prompt(query: &str) -> String {
    format!(
        "You are a helpful mental health assistant.\n\n\
         User's challenge:\n{query}\n\n\
         There were no matching past counseling conversations. \
         Please generate the best suggestion possible based solely on your training and best practices.\n",
        query = query,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(context: &str, response: &str, score: f32) -> Match {
        Match {
            context: context.to_string(),
            response: response.to_string(),
            score,
        }
    }

    #[test]
    fn test_blocks_follow_ranked_order() {
        let blocks = example_blocks(&[
            case("first ctx", "first resp", 0.9),
            case("second ctx", "second resp", 0.5),
        ]);
        assert_eq!(
            blocks,
            "Context: first ctx\nResponse: first resp\n\n\
             Context: second ctx\nResponse: second resp\n\n"
        );
    }

    #[test]
    fn test_grounded_prompt_layout() {
        let prompt = grounded_prompt(
            "I feel anxious about exams",
            &[case("student exam anxiety", "Breathing exercises", 0.82)],
        );
        assert_eq!(
            prompt,
            "You are a helpful mental health assistant.\n\n\
             User's challenge:\nI feel anxious about exams\n\n\
             Here are some relevant past context-response examples:\n\
             Context: student exam anxiety\nResponse: Breathing exercises\n\n\n\n\
             Based on the above, suggest the best way to help the patient.\n"
        );
    }

    #[test]
    fn test_fallback_prompt_states_no_prior_cases() {
        let prompt = fallback_prompt("I feel anxious about exams");
        assert!(prompt.starts_with("You are a helpful mental health assistant.\n\n"));
        assert!(prompt.contains("User's challenge:\nI feel anxious about exams\n"));
        assert!(prompt.contains("There were no matching past counseling conversations."));
        assert!(prompt.contains("best practices"));
        assert!(!prompt.contains("Context:"));
    }
}
