//! Transfer Engine.

use sea_orm::{DatabaseTransaction, TransactionTrait};

use crate::{EngineError, LedgerEntry, ResultEngine, SendCoinsCmd, util::normalize_username};

use super::{Engine, with_tx};

impl Engine {
    /// Move `amount` coins from the sender to the recipient.
    ///
    /// One atomic unit: recipient check, debit, sender entry, credit,
    /// recipient entry. Either all five happen or none does.
    pub async fn send_coins(&self, cmd: SendCoinsCmd) -> ResultEngine<()> {
        if cmd.amount < 1 {
            return Err(EngineError::InvalidAmount(
                "amount must be >= 1".to_string(),
            ));
        }
        let recipient = normalize_username(&cmd.recipient)
            .map_err(|_| EngineError::RecipientNotFound(cmd.recipient.clone()))?;
        if recipient == cmd.sender.username {
            return Err(EngineError::InvalidRecipient(
                "cannot send coins to yourself".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.transfer(&db_tx, &cmd, &recipient).await
        })
    }

    async fn transfer(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &SendCoinsCmd,
        recipient: &str,
    ) -> ResultEngine<()> {
        let recipient_user = self
            .find_user_by_username(db_tx, recipient)
            .await?
            .ok_or_else(|| EngineError::RecipientNotFound(recipient.to_string()))?;
        let sender_user = self.require_user(db_tx, cmd.sender.user_id).await?;
        if sender_user.id == recipient_user.id {
            return Err(EngineError::InvalidRecipient(
                "cannot send coins to yourself".to_string(),
            ));
        }

        let sender_balance = sender_user.balance_uuid()?;
        let recipient_balance = recipient_user.balance_uuid()?;
        self.lock_balances(db_tx, &[sender_balance, recipient_balance])
            .await?;

        let sender = sender_user.username.as_str();
        if self
            .debit_if_sufficient(db_tx, sender_balance, cmd.amount)
            .await?
            == 0
        {
            return Err(EngineError::InsufficientFunds(format!(
                "{sender} cannot send {}",
                cmd.amount
            )));
        }
        self.append_entry(
            db_tx,
            &LedgerEntry::new(sender_balance, cmd.amount, sender, recipient),
        )
        .await?;

        self.credit(db_tx, recipient_balance, cmd.amount).await?;
        self.append_entry(
            db_tx,
            &LedgerEntry::new(recipient_balance, cmd.amount, sender, recipient),
        )
        .await?;

        Ok(())
    }
}
