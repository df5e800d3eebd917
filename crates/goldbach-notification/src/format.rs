//! 알림 메시지 포맷.
//!
//! Telegram HTML parse mode 기준으로 메시지를 만들고, Discord는 이를 Markdown으로 변환해 사용합니다.

use goldbach_core::{Bias, TradeSetup};

use crate::types::{Notification, NotificationEvent};

/// 바이어스 이모지
pub fn bias_emoji(bias: Bias) -> &'static str {
    match bias {
        Bias::Bullish => "🟢",
        Bias::Bearish => "🔴",
        Bias::Neutral => "⚪",
    }
}

/// HTML 특수문자 이스케이프
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Telegram HTML 메시지를 Discord Markdown으로 변환
pub fn html_to_markdown(html: &str) -> String {
    html.replace("<b>", "**")
        .replace("</b>", "**")
        .replace("<i>", "*")
        .replace("</i>", "*")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// 알림을 HTML 메시지로 변환
pub fn format_html(notification: &Notification) -> String {
    match &notification.event {
        NotificationEvent::SignalAlert { setup } => format_signal(setup),

        NotificationEvent::PositionUpdate {
            symbol,
            price,
            position_str,
            layer,
            bias,
            confidence,
        } => {
            let layer = layer.map(|l| l.to_string()).unwrap_or_else(|| "N/A".to_string());
            format!(
                "📊 <b>GOLDBACH ANALYSIS</b> - {}\n\n\
                 <b>Price:</b> {}\n\
                 <b>Position:</b> {}\n\
                 <b>Layer:</b> {}\n\
                 <b>Bias:</b> {} ({}%)\n\n\
                 <i>No clear setup at current price</i>",
                escape_html(symbol),
                price,
                position_str,
                layer,
                bias,
                confidence
            )
        }

        NotificationEvent::PriceAlert {
            symbol,
            condition,
            target,
            current,
            triggered_at,
        } => format!(
            "🚨 <b>PRICE ALERT TRIGGERED</b> 🚨\n\n\
             <b>Symbol:</b> {}\n\
             <b>Condition:</b> {} {}\n\
             <b>Current:</b> {}\n\
             <b>Time:</b> {}",
            escape_html(symbol),
            escape_html(condition),
            target,
            current,
            triggered_at.format("%H:%M:%S")
        ),

        NotificationEvent::DailyReport {
            generated_at,
            lines,
        } => {
            let mut out = vec![
                "📈 <b>DAILY GOLDBACH REPORT</b>\n".to_string(),
                format!("<i>{}</i>\n", generated_at.format("%Y-%m-%d %H:%M")),
            ];
            out.extend(lines.iter().cloned());
            out.join("\n")
        }

        NotificationEvent::Custom { title, message } => {
            format!("<b>{}</b>\n\n{}", escape_html(title), message)
        }
    }
}

fn format_signal(setup: &TradeSetup) -> String {
    let emoji = bias_emoji(setup.bias);
    let mut message = format!(
        "{emoji} <b>GOLDBACH SIGNAL</b> {emoji}\n\n\
         <b>Symbol:</b> {}\n\
         <b>Plan:</b> {}\n\
         <b>Bias:</b> {} ({}%)\n\
         <b>Strength:</b> {}\n\n\
         <b>Entry Zone:</b> {:.2} - {:.2}\n\
         <b>Entry:</b> {:.2}\n\
         <b>Stop Loss:</b> {:.2}\n\n\
         <b>Targets:</b>\n",
        escape_html(&setup.symbol),
        setup.plan,
        setup.bias,
        setup.confidence,
        setup.signal_strength,
        setup.entry_zone.0,
        setup.entry_zone.1,
        setup.entry_price,
        setup.stop_loss,
    );

    for target in &setup.targets {
        message.push_str(&format!("  • {}: {:.2}\n", target.name, target.price));
    }

    if setup.goldbach_time_confirm {
        message.push_str("\n✅ Goldbach Time Confirmation");
    }

    message.push_str(&format!("\n<b>AMD:</b> {}", setup.amd_cycle));
    message.push_str(&format!("\n<i>{}</i>", setup.timestamp.format("%H:%M:%S")));

    message
}
