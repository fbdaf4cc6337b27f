// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Healing Buds

//! Branded HTML email templates for order and client/KYC notifications.

use crate::config::RegionBrand;

/// A rendered email: subject line plus HTML body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
}

/// Client-facing notification categories for KYC and eligibility outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEmailKind {
    /// A hosted KYC flow link was generated for the patient.
    KycLink,
    /// Identity verification completed successfully.
    KycApproved,
    /// Identity verification failed or was rejected.
    KycRejected,
    /// Medical review approved the patient for purchase.
    EligibilityApproved,
    /// Medical review rejected the application.
    EligibilityRejected,
}

/// Shared layout: colored header band, body copy, optional detail box,
/// optional call-to-action button, branded footer.
fn layout(
    brand: &RegionBrand,
    color: &str,
    body: &str,
    detail: Option<(&str, &str)>,
    action: Option<(&str, &str)>,
) -> String {
    let detail_html = detail
        .map(|(label, value)| {
            format!(
                r#"<div style="background-color: #f4f4f5; border-radius: 8px; padding: 16px; margin: 24px 0;">
              <p style="margin: 0; color: #71717a; font-size: 14px;">{label}</p>
              <p style="margin: 4px 0 0 0; color: #18181b; font-size: 18px; font-family: monospace; font-weight: 600;">{value}</p>
            </div>"#
            )
        })
        .unwrap_or_default();

    let action_html = action
        .map(|(label, href)| {
            format!(
                r#"<div style="text-align: center; margin-top: 32px;">
              <a href="{href}" style="display: inline-block; background-color: {color}; color: #ffffff; text-decoration: none; padding: 12px 32px; border-radius: 8px; font-weight: 600;">{label}</a>
            </div>"#
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5; margin: 0; padding: 20px;">
  <div style="max-width: 600px; margin: 0 auto; background-color: #ffffff; border-radius: 12px; overflow: hidden; box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);">
    <div style="background-color: {color}; padding: 24px; text-align: center;">
      <h1 style="color: #ffffff; margin: 0; font-size: 24px;">{brand_name}</h1>
    </div>
    <div style="padding: 32px;">
      <p style="color: #18181b; font-size: 16px; line-height: 1.6; margin: 0 0 16px 0;">{body}</p>
      {detail_html}
      {action_html}
    </div>
    <div style="background-color: #f4f4f5; padding: 20px; text-align: center;">
      <p style="margin: 0; color: #71717a; font-size: 12px;">{brand_name} Medical Cannabis</p>
      <p style="margin: 8px 0 0 0; color: #a1a1aa; font-size: 11px;">This is an automated message. Please do not reply to this email.</p>
    </div>
  </div>
</body>
</html>"#,
        brand_name = brand.brand_name,
    )
}

/// Render an order status notification.
///
/// Known events get a dedicated subject and accent color; anything routed
/// here with an unrecognized name falls back to the generic status-update
/// template.
pub fn order_status_email(
    order_id: &str,
    status: &str,
    event: &str,
    brand: &RegionBrand,
) -> EmailContent {
    let (subject, body, color) = match event {
        "order.shipped" => (
            "🚚 Your order has been shipped!".to_string(),
            "Great news! Your order has been shipped and is on its way to you.".to_string(),
            "#3b82f6",
        ),
        "order.delivered" => (
            "✅ Your order has been delivered!".to_string(),
            "Your order has been successfully delivered. We hope you enjoy your products!"
                .to_string(),
            "#22c55e",
        ),
        "order.cancelled" => (
            "❌ Your order has been cancelled".to_string(),
            "Your order has been cancelled. If you have any questions, please contact our support team."
                .to_string(),
            "#ef4444",
        ),
        "payment.completed" => (
            "💳 Payment confirmed for your order".to_string(),
            "Your payment has been successfully processed. Your order is now being prepared."
                .to_string(),
            "#22c55e",
        ),
        "payment.failed" => (
            "⚠️ Payment failed for your order".to_string(),
            "Unfortunately, your payment could not be processed. Please try again or contact support."
                .to_string(),
            "#ef4444",
        ),
        _ => (
            format!("📦 Order status update: {status}"),
            format!("Your order status has been updated to: {status}"),
            "#8b5cf6",
        ),
    };

    let orders_url = format!("https://{}/orders", brand.domain);
    EmailContent {
        subject,
        html: layout(
            brand,
            color,
            &body,
            Some(("Order ID", order_id)),
            Some(("View Order Details", &orders_url)),
        ),
    }
}

/// Render a client/KYC notification.
pub fn client_email(
    kind: ClientEmailKind,
    name: &str,
    brand: &RegionBrand,
    kyc_link: Option<&str>,
    rejection_reason: Option<&str>,
) -> EmailContent {
    let shop_url = format!("https://{}/shop", brand.domain);
    match kind {
        ClientEmailKind::KycLink => {
            let link = kyc_link.unwrap_or(&shop_url);
            EmailContent {
                subject: "🔍 Complete your identity verification".to_string(),
                html: layout(
                    brand,
                    "#3b82f6",
                    &format!(
                        "Hi {name}, one last step before you can order: please complete your identity verification using the secure link below."
                    ),
                    None,
                    Some(("Start Verification", link)),
                ),
            }
        }
        ClientEmailKind::KycApproved => EmailContent {
            subject: "✅ Identity verification complete".to_string(),
            html: layout(
                brand,
                "#22c55e",
                &format!(
                    "Hi {name}, your identity has been verified. You can now continue with your medical consultation and order."
                ),
                None,
                Some(("Visit the Shop", &shop_url)),
            ),
        },
        ClientEmailKind::KycRejected => {
            let reason = rejection_reason.unwrap_or("Your documents could not be verified.");
            let retry = kyc_link.unwrap_or(&shop_url);
            EmailContent {
                subject: "⚠️ Identity verification needs attention".to_string(),
                html: layout(
                    brand,
                    "#ef4444",
                    &format!(
                        "Hi {name}, we could not complete your identity verification. {reason} You can retry using the link below."
                    ),
                    None,
                    Some(("Retry Verification", retry)),
                ),
            }
        }
        ClientEmailKind::EligibilityApproved => EmailContent {
            subject: "🌿 You have been approved".to_string(),
            html: layout(
                brand,
                "#22c55e",
                &format!(
                    "Hi {name}, our medical team has approved your eligibility. Welcome aboard - you can now browse and order your prescribed products."
                ),
                None,
                Some(("Visit the Shop", &shop_url)),
            ),
        },
        ClientEmailKind::EligibilityRejected => {
            let reason =
                rejection_reason.unwrap_or("Your application did not meet the medical criteria.");
            EmailContent {
                subject: "Your eligibility application update".to_string(),
                html: layout(
                    brand,
                    "#ef4444",
                    &format!(
                        "Hi {name}, unfortunately we could not approve your eligibility application at this time. {reason} If you believe this is an error, please contact our support team."
                    ),
                    None,
                    None,
                ),
            }
        }
    }
}
