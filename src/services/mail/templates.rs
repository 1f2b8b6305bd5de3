//! 评阅结果邮件
//!
//! 邮件内容从通知本身还原：任务编号与名称取自标题，状态取自正文。

use crate::models::answers::entities::AnswerStatus;
use crate::models::notifications::entities::Notification;
use crate::models::users::entities::User;

use super::OutgoingEmail;

/// 渲染邮件所需的上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEmailContext {
    pub receiver_email: String,
    pub first_name: String,
    pub task_number: String,
    pub task_name: String,
    pub status: AnswerStatus,
    pub feedback_text: Option<String>,
}

impl AnswerEmailContext {
    /// 接收者缺少邮箱或名字、标题中解析不出任务时返回 `None`
    pub fn from_notification(notification: &Notification, receiver: &User) -> Option<Self> {
        let (task_number, task_name) = parse_task_title(&notification.title)?;
        if receiver.email.trim().is_empty() || receiver.first_name.trim().is_empty() {
            return None;
        }

        Some(Self {
            receiver_email: receiver.email.clone(),
            first_name: receiver.first_name.clone(),
            task_number,
            task_name,
            status: infer_status(&notification.content),
            feedback_text: notification
                .feedback
                .clone()
                .filter(|text| !text.trim().is_empty()),
        })
    }
}

/// 从 `... Task 3. Linked lists has been ...` 中取出 `("3", "Linked lists")`
pub fn parse_task_title(title: &str) -> Option<(String, String)> {
    let words: Vec<&str> = title.split_whitespace().collect();
    let position = words.iter().position(|word| word.starts_with("Task"))?;
    if position + 1 >= words.len() {
        return None;
    }

    let rest = words[position + 1..].join(" ");
    let task_info = rest.split(" has been").next().unwrap_or_default();
    let (number, name) = task_info.split_once('.')?;
    let (number, name) = (number.trim(), name.trim());
    if number.is_empty() || name.is_empty() {
        return None;
    }
    Some((number.to_string(), name.to_string()))
}

/// 按正文关键字推断状态，默认视为 `have_flaws`
pub fn infer_status(content: &str) -> AnswerStatus {
    let content = content.to_lowercase();
    if content.contains("approved") {
        AnswerStatus::Approved
    } else if content.contains("rejected") {
        AnswerStatus::Rejected
    } else {
        AnswerStatus::HaveFlaws
    }
}

struct StatusStyle {
    subject: &'static str,
    status_text: &'static str,
    message: &'static str,
    color: &'static str,
}

fn status_style(status: AnswerStatus) -> StatusStyle {
    match status {
        AnswerStatus::Approved => StatusStyle {
            subject: "Answer Approved",
            status_text: "Approved",
            message: "Your answer has been approved.",
            color: "#16a34a",
        },
        AnswerStatus::Rejected => StatusStyle {
            subject: "Answer Needs Revision",
            status_text: "Needs Revision",
            message: "Your answer requires changes before approval.",
            color: "#dc2626",
        },
        _ => StatusStyle {
            subject: "Answer Under Review",
            status_text: "Under Review",
            message: "Your answer has been reviewed with feedback.",
            color: "#d97706",
        },
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// 生成主题、纯文本与 HTML 正文
pub fn render_answer_email(ctx: &AnswerEmailContext) -> OutgoingEmail {
    let style = status_style(ctx.status);
    let subject = format!("{} - Task #{}", style.subject, ctx.task_number);

    let feedback_line = ctx
        .feedback_text
        .as_deref()
        .map(|text| format!("Feedback: {text}\n\n"))
        .unwrap_or_default();
    let text = format!(
        "Hello {first_name},\n\n\
         Your answer for Task #{number} - {name} has been reviewed.\n\n\
         Status: {status}\n\
         {message}\n\n\
         {feedback_line}\
         Please log into your account to view details and take any necessary actions.\n\n\
         Best regards,\n\
         The Review Team\n",
        first_name = ctx.first_name,
        number = ctx.task_number,
        name = ctx.task_name,
        status = style.status_text,
        message = style.message,
    );

    let feedback_block = ctx
        .feedback_text
        .as_deref()
        .map(|text| {
            format!(
                r#"<div style="margin: 0 0 24px; padding: 16px; background: #f8f9fa; border-left: 4px solid {color};">
  <p style="margin: 0 0 8px; font-weight: 600; color: #212529;">Feedback</p>
  <p style="margin: 0; color: #495057; white-space: pre-wrap;">{text}</p>
</div>"#,
                color = style.color,
                text = escape_html(text),
            )
        })
        .unwrap_or_default();
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin: 0; padding: 32px; font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; background: #ffffff;">
<div style="max-width: 560px; margin: 0 auto;">
  <p style="margin: 0 0 24px; font-size: 16px; color: #495057;">Hello {first_name},</p>
  <h3 style="margin: 0 0 8px; font-size: 18px; color: #212529;">{name}</h3>
  <p style="margin: 0 0 16px; font-size: 14px; color: #6c757d;">Task #{number}</p>
  <p style="margin: 0 0 8px; font-size: 16px; font-weight: 600; color: {color};">{status}</p>
  <p style="margin: 0 0 24px; font-size: 16px; color: #495057;">{message}</p>
  {feedback_block}
  <p style="margin: 0 0 24px; font-size: 14px; color: #495057;">Please log into your account to view details and take any necessary actions.</p>
  <p style="margin: 0; font-size: 12px; color: #adb5bd;">This is an automated notification. Please do not reply to this email.</p>
</div>
</body>
</html>"#,
        first_name = escape_html(&ctx.first_name),
        name = escape_html(&ctx.task_name),
        number = escape_html(&ctx.task_number),
        color = style.color,
        status = style.status_text,
        message = style.message,
    );

    OutgoingEmail {
        to: ctx.receiver_email.clone(),
        subject,
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::{UserRole, UserStatus};

    fn receiver(first_name: &str) -> User {
        let now = chrono::Utc::now();
        User {
            id: 2,
            username: "student".into(),
            email: "student@example.com".into(),
            password_hash: String::new(),
            first_name: first_name.into(),
            last_name: "Tester".into(),
            role: UserRole::Student,
            status: UserStatus::Active,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn notification(title: &str, content: &str, feedback: Option<&str>) -> Notification {
        let now = chrono::Utc::now();
        Notification {
            id: 1,
            receiver_id: 2,
            sender_id: Some(1),
            answer_id: Some(1),
            title: title.into(),
            content: content.into(),
            feedback: feedback.map(str::to_string),
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parse_task_title_variants() {
        assert_eq!(
            parse_task_title("Your answer for Task 3. Linked lists has been reviewed with grade added"),
            Some(("3".into(), "Linked lists".into()))
        );
        assert_eq!(
            parse_task_title("Your grade for Task 12. Graphs. Part 2 has been updated"),
            Some(("12".into(), "Graphs. Part 2".into()))
        );
        assert_eq!(
            parse_task_title("Your answer for Task -. Warmup has been updated"),
            Some(("-".into(), "Warmup".into()))
        );
        assert_eq!(parse_task_title("Welcome aboard"), None);
        assert_eq!(parse_task_title("Task"), None);
    }

    #[test]
    fn test_infer_status_from_content() {
        assert_eq!(
            infer_status("Great job! Your answer has been approved ✅."),
            AnswerStatus::Approved
        );
        assert_eq!(
            infer_status("Unfortunately, your answer was rejected ❌."),
            AnswerStatus::Rejected
        );
        assert_eq!(infer_status("Your answer has some issues"), AnswerStatus::HaveFlaws);
        assert_eq!(infer_status("Status: In review"), AnswerStatus::HaveFlaws);
    }

    #[test]
    fn test_context_requires_first_name_and_task() {
        let n = notification(
            "Your answer for Task 3. Linked lists has been reviewed",
            "Great job! Your answer has been approved ✅.",
            Some("  "),
        );
        let ctx = AnswerEmailContext::from_notification(&n, &receiver("Ada")).unwrap();
        assert_eq!(ctx.task_number, "3");
        assert_eq!(ctx.status, AnswerStatus::Approved);
        assert_eq!(ctx.feedback_text, None);

        assert!(AnswerEmailContext::from_notification(&n, &receiver("")).is_none());
        let untitled = notification("Hello", "approved", None);
        assert!(AnswerEmailContext::from_notification(&untitled, &receiver("Ada")).is_none());
    }

    #[test]
    fn test_subjects_per_status() {
        let mut ctx = AnswerEmailContext {
            receiver_email: "a@example.com".into(),
            first_name: "Ada".into(),
            task_number: "7".into(),
            task_name: "Trees".into(),
            status: AnswerStatus::Approved,
            feedback_text: Some("<b>nice</b>".into()),
        };
        let email = render_answer_email(&ctx);
        assert_eq!(email.subject, "Answer Approved - Task #7");
        assert!(email.text.contains("Hello Ada,"));
        assert!(email.text.contains("Feedback: <b>nice</b>"));
        assert!(email.html.contains("&lt;b&gt;nice&lt;/b&gt;"));

        ctx.status = AnswerStatus::Rejected;
        assert_eq!(render_answer_email(&ctx).subject, "Answer Needs Revision - Task #7");
        ctx.status = AnswerStatus::InReview;
        assert_eq!(render_answer_email(&ctx).subject, "Answer Under Review - Task #7");
    }
}
