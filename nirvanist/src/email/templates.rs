//! Branded HTML bodies for outgoing email.

const BRAND_GREEN: &str = "#70c92e";
const BRAND_GREEN_DARK: &str = "#4f8638";
const BRAND_FOREST: &str = "#253e1a";
const BRAND_SAND: &str = "#f7f2e8";

pub const NEWSLETTER_CONFIRMATION_SUBJECT: &str = "Welcome to The Nirvanist! Please Confirm Your Subscription";
pub const EMAIL_VERIFICATION_SUBJECT: &str = "Verify Your Email - The Nirvanist";
pub const PASSWORD_RESET_SUBJECT: &str = "Reset Your Password - The Nirvanist";

#[derive(Debug, Clone)]
pub struct Rendered {
    pub subject: String,
    pub html: String,
}

/// Contact form fields as submitted by the visitor.
#[derive(Debug, Clone)]
pub struct ContactDetails<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
}

struct CallToAction<'a> {
    title: &'a str,
    tagline: &'a str,
    heading: &'a str,
    greeting: Option<String>,
    body: &'a str,
    button_label: &'a str,
    url: &'a str,
    disclaimer: &'a str,
}

pub fn newsletter_confirmation(confirm_url: &str) -> Rendered {
    Rendered {
        subject: NEWSLETTER_CONFIRMATION_SUBJECT.to_string(),
        html: call_to_action(&CallToAction {
            title: "Welcome to The Nirvanist!",
            tagline: "Spiritual Insights &amp; Sacred Journeys",
            heading: "Confirm Your Subscription",
            greeting: None,
            body: "Thank you for subscribing to The Nirvanist newsletter! Please click the button below to confirm your \
                   subscription and start receiving spiritual insights, journey updates, and exclusive content.",
            button_label: "Confirm Subscription",
            url: confirm_url,
            disclaimer: "If you didn't subscribe to our newsletter, you can safely ignore this email.",
        }),
    }
}

pub fn email_verification(first_name: &str, verification_url: &str) -> Rendered {
    Rendered {
        subject: EMAIL_VERIFICATION_SUBJECT.to_string(),
        html: call_to_action(&CallToAction {
            title: "Welcome to The Nirvanist",
            tagline: "Your spiritual journey begins here",
            heading: "Verify Your Email Address",
            greeting: greeting(first_name),
            body: "Thank you for joining The Nirvanist community! Please click the button below to verify your email \
                   address and complete your registration.",
            button_label: "Verify Email Address",
            url: verification_url,
            disclaimer: "If you didn't create an account with The Nirvanist, you can safely ignore this email.",
        }),
    }
}

pub fn password_reset(first_name: &str, reset_url: &str) -> Rendered {
    Rendered {
        subject: PASSWORD_RESET_SUBJECT.to_string(),
        html: call_to_action(&CallToAction {
            title: "Password Reset",
            tagline: "The Nirvanist",
            heading: "Reset Your Password",
            greeting: greeting(first_name),
            body: "We received a request to reset your password. Click the button below to create a new password. \
                   This link will expire in 1 hour.",
            button_label: "Reset Password",
            url: reset_url,
            disclaimer: "If you didn't request a password reset, you can safely ignore this email. \
                         Your password will remain unchanged.",
        }),
    }
}

pub fn contact_notification(details: &ContactDetails<'_>) -> Rendered {
    let message = escape_html(details.message).replace('\n', "<br>");
    let html = format!(
        r#"<div style="max-width: 600px; margin: 0 auto; font-family: Arial, sans-serif;">
  <div style="background: {BRAND_FOREST}; padding: 20px 30px;">
    <h1 style="color: white; margin: 0; font-size: 22px;">New contact message</h1>
  </div>
  <div style="padding: 30px; background: white; color: #333; line-height: 1.6;">
    <p><strong>From:</strong> {name} &lt;{email}&gt;</p>
    <p><strong>Subject:</strong> {subject}</p>
    <div style="border-left: 4px solid {BRAND_GREEN}; padding-left: 16px; margin-top: 20px;">{message}</div>
  </div>
  <div style="background: {BRAND_SAND}; padding: 16px 30px; font-size: 12px; color: #666;">
    Reply to this email to answer the visitor directly.
  </div>
</div>"#,
        name = escape_html(details.name),
        email = escape_html(details.email),
        subject = escape_html(details.subject),
    );

    Rendered {
        subject: format!("New contact message: {}", details.subject),
        html,
    }
}

fn greeting(first_name: &str) -> Option<String> {
    let name = first_name.trim();
    (!name.is_empty()).then(|| format!("Hello {},", escape_html(name)))
}

fn call_to_action(email: &CallToAction<'_>) -> String {
    let greeting = email
        .greeting
        .as_deref()
        .map(|g| format!(r#"<p style="color: #333; margin-bottom: 16px;">{g}</p>"#))
        .unwrap_or_default();

    format!(
        r#"<div style="max-width: 600px; margin: 0 auto; font-family: Arial, sans-serif;">
  <div style="background: linear-gradient(135deg, {BRAND_GREEN}, {BRAND_GREEN_DARK}); padding: 30px; text-align: center;">
    <h1 style="color: white; margin: 0; font-size: 28px;">{title}</h1>
    <p style="color: white; margin: 10px 0 0 0; font-size: 16px;">{tagline}</p>
  </div>
  <div style="padding: 40px 30px; background: white;">
    <h2 style="color: {BRAND_FOREST}; margin-bottom: 20px;">{heading}</h2>
    {greeting}
    <p style="color: #666; line-height: 1.6; margin-bottom: 30px;">{body}</p>
    <div style="text-align: center; margin: 40px 0;">
      <a href="{url}" style="background: {BRAND_GREEN}; color: white; padding: 15px 30px; text-decoration: none; border-radius: 8px; font-weight: bold; display: inline-block;">{button_label}</a>
    </div>
    <p style="color: #999; font-size: 14px; margin-top: 30px;">{disclaimer}</p>
    <p style="color: #999; font-size: 14px;">If the button doesn't work, copy and paste this link into your browser:<br>
      <a href="{url}" style="color: {BRAND_GREEN};">{url}</a>
    </p>
  </div>
  <div style="background: {BRAND_SAND}; padding: 20px 30px; text-align: center;">
    <p style="color: #666; margin: 0; font-size: 14px;">&copy; The Nirvanist. Connecting souls with sacred journeys.</p>
  </div>
</div>"#,
        title = email.title,
        tagline = email.tagline,
        heading = email.heading,
        body = email.body,
        button_label = email.button_label,
        url = email.url,
        disclaimer = email.disclaimer,
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_to_action_repeats_link_as_text() {
        let rendered = newsletter_confirmation("https://thenirvanist.com/confirm-newsletter?token=t1");
        assert_eq!(rendered.html.matches("confirm-newsletter?token=t1").count(), 3);
        assert!(rendered.html.contains(BRAND_GREEN));
        assert!(rendered.html.contains(BRAND_SAND));
    }

    #[test]
    fn test_greeting_is_optional() {
        let with_name = email_verification("Asha", "https://x/verify-email?token=a");
        assert!(with_name.html.contains("Hello Asha,"));

        let without = password_reset("  ", "https://x/reset-password?token=a");
        assert!(!without.html.contains("Hello"));
        assert!(without.html.contains("expire in 1 hour"));
    }

    #[test]
    fn test_contact_notification_escapes_visitor_input() {
        let rendered = contact_notification(&ContactDetails {
            name: "<script>alert(1)</script>",
            email: "x@y.com",
            subject: "Hi & bye",
            message: "line one\nline two",
        });

        assert!(!rendered.html.contains("<script>"));
        assert!(rendered.html.contains("&lt;script&gt;"));
        assert!(rendered.html.contains("Hi &amp; bye"));
        assert!(rendered.html.contains("line one<br>line two"));
        assert_eq!(rendered.subject, "New contact message: Hi & bye");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a<b>"c"'d'&"#), "a&lt;b&gt;&quot;c&quot;&#39;d&#39;&amp;");
    }
}
