//! Humanized sales-call scripts.
//!
//! Generated synchronously from templates; sales calls never go through the
//! batch queue because the rep needs the script while dialing.

use super::RequestContext;

pub fn sales_call_script(content: &str, ctx: &RequestContext) -> String {
    let customer = ctx.customer_name.as_deref().unwrap_or("there");
    let company = ctx.company_name.as_deref().unwrap_or("our team");
    let purpose = content.trim().trim_end_matches(['.', '!', '?']);

    let mut script = format!(
        "Hi {customer}, this is {company} calling. Do you have a couple of minutes?\n\n\
         I'm reaching out because {}.\n\n",
        lowercase_first(purpose)
    );
    script.push_str(
        "A lot of shippers we work with were juggling missed pickups and surprise \
         accessorials before they switched. We'd like to understand what's working \
         for you today and where the friction is.\n\n",
    );
    script.push_str("Questions to ask:\n");
    script.push_str("- Which lanes are giving you the most trouble right now?\n");
    script.push_str("- How are you tracking loads once they leave the dock?\n");
    script.push_str("- What would a good month look like for your freight spend?\n\n");
    script.push_str(
        "If this sounds useful, would later this week work for a short follow-up \
         so we can put some real numbers in front of you?",
    );
    script
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => "I wanted to introduce our freight services".to_string(),
    }
}
