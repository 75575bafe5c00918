//! membership-engine binary.
//!
//! Runs one maintenance pass (daily sweep then idempotency cleanup) against
//! Postgres, or a single admin action:
//!
//! ```text
//! membership-engine [maintenance]
//! membership-engine resend-receipt <order_id>
//! membership-engine refund <order_id> <amount> [reason]
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use membership_engine::adapters::email::{LoggingEmailSender, ResendEmailSender};
use membership_engine::adapters::postgres::{
    self, PostgresCapabilityGrantor, PostgresLevelCatalog, PostgresMembershipRepository,
    PostgresNotificationLog, PostgresOrderRepository, PostgresProcessedEventStore,
    PostgresUserDirectory,
};
use membership_engine::adapters::stripe::{StripeConfig, StripeGateway};
use membership_engine::adapters::TracingEventSink;
use membership_engine::application::{
    DailySweep, IdempotencyService, MembershipLifecycle, OrderReconciliation,
    ReconciliationSettings, RefundOutcome,
};
use membership_engine::config::AppConfig;
use membership_engine::domain::foundation::{Clock, Money, OrderId, SystemClock};
use membership_engine::ports::{
    EmailSender, EventSink, FixedGracePolicy, GatewayRegistry, MembershipRepository,
};
use membership_engine::telemetry;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

enum Command {
    Maintenance,
    ResendReceipt(OrderId),
    Refund {
        order_id: OrderId,
        amount: Money,
        reason: Option<String>,
    },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, BoxError> {
        match args.first().map(String::as_str) {
            None | Some("maintenance") => Ok(Command::Maintenance),
            Some("resend-receipt") => {
                let order_id = args.get(1).ok_or("resend-receipt needs an order id")?;
                Ok(Command::ResendReceipt(order_id.parse()?))
            }
            Some("refund") => {
                let order_id: OrderId = args.get(1).ok_or("refund needs an order id")?.parse()?;
                let amount: f64 = args.get(2).ok_or("refund needs an amount")?.parse()?;
                if !amount.is_finite() || amount <= 0.0 {
                    return Err("refund amount must be positive".into());
                }
                Ok(Command::Refund {
                    order_id,
                    amount: Money::from_major(amount),
                    reason: args.get(3).cloned(),
                })
            }
            Some(other) => Err(format!("unknown command: {}", other).into()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match AppConfig::load_validated() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("membership-engine: {}", e);
            return ExitCode::FAILURE;
        }
    };
    telemetry::init_tracing(&config.telemetry);

    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            tracing::error!(error = %e, "Invalid arguments");
            return ExitCode::from(2);
        }
    };

    match run(config, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig, command: Command) -> Result<(), BoxError> {
    let pool = postgres::connect(&config.database).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);
    let memberships: Arc<dyn MembershipRepository> =
        Arc::new(PostgresMembershipRepository::new(pool.clone()));
    let users = Arc::new(PostgresUserDirectory::new(pool.clone()));
    let orders = Arc::new(PostgresOrderRepository::new(pool.clone()));

    let emails: Arc<dyn EmailSender> = match &config.email.resend_api_key {
        Some(key) => Arc::new(ResendEmailSender::new(key.clone(), config.email.from_header())),
        None => {
            tracing::warn!("No email provider configured; emails will only be logged");
            Arc::new(LoggingEmailSender::new())
        }
    };

    match command {
        Command::Maintenance => {
            let lifecycle = Arc::new(MembershipLifecycle::new(
                memberships.clone(),
                Arc::new(PostgresLevelCatalog::new(pool.clone())),
                users,
                Arc::new(PostgresCapabilityGrantor::new(pool.clone())),
                Arc::new(FixedGracePolicy::new(config.lifecycle.grace_period_days)),
                events,
                clock.clone(),
            ));
            let sweep = DailySweep::new(
                lifecycle,
                memberships,
                Arc::new(PostgresNotificationLog::new(pool.clone())),
                emails,
                clock.clone(),
                config.lifecycle.expiry_warning_days,
            );
            let report = sweep.run_daily().await?;
            tracing::info!(expired = report.expired, warned = report.warned, "Daily sweep finished");

            let idempotency =
                IdempotencyService::new(Arc::new(PostgresProcessedEventStore::new(pool)), clock);
            let removed = idempotency
                .cleanup(config.lifecycle.processed_event_retention_days)
                .await?;
            tracing::info!(removed, "Processed event cleanup finished");
        }
        Command::ResendReceipt(order_id) => {
            let reconciliation = reconciliation(&config, orders, users, emails, events, clock);
            reconciliation.handle_resend_receipt(order_id).await?;
            tracing::info!(order_id = %order_id, "Receipt sent");
        }
        Command::Refund {
            order_id,
            amount,
            reason,
        } => {
            let reconciliation = reconciliation(&config, orders, users, emails, events, clock);
            match reconciliation
                .handle_refund_recorded(order_id, amount, reason, None)
                .await?
            {
                RefundOutcome::Succeeded { refund_id, .. } => {
                    tracing::info!(order_id = %order_id, refund_id = %refund_id, "Refund recorded");
                }
                RefundOutcome::Failed(result) => {
                    return Err(format!("refund failed: {}", result.message()).into());
                }
            }
        }
    }

    Ok(())
}

fn reconciliation(
    config: &AppConfig,
    orders: Arc<PostgresOrderRepository>,
    users: Arc<PostgresUserDirectory>,
    emails: Arc<dyn EmailSender>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
) -> OrderReconciliation {
    let mut gateways = GatewayRegistry::new();
    if let Some(payment) = &config.payment {
        let stripe = StripeConfig::new(payment.stripe_api_key.clone(), payment.currency.clone())
            .with_base_url(payment.stripe_api_base.clone())
            .with_timeout(payment.request_timeout());
        gateways = gateways.with_gateway(Arc::new(StripeGateway::new(stripe)));
    }

    OrderReconciliation::new(
        orders,
        users,
        Arc::new(gateways),
        emails,
        events,
        clock,
        ReconciliationSettings {
            admin_email: config.email.admin_email.clone(),
            gateway_timeout: config.lifecycle.gateway_timeout(),
        },
    )
}
