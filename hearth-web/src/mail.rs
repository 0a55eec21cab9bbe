/// Outbound mail
///
/// Handlers never wait on mail. They put [`MailData`] on a bounded [`MailQueue`] and
/// carry on; one listener task started by [`spawn_mail_listener`] takes messages off the
/// queue and hands them to the delivery log. When the queue is full or closed the
/// message is dropped with a warning and the request still succeeds.
///
/// A confirmed booking queues two messages, see [`booking_messages`]: a confirmation
/// to the guest and a notification to the house.

use hearth_shared::models::Reservation;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::MailConfig;

/// Messages that may wait for the listener before new ones are dropped
pub const MAIL_QUEUE_CAPACITY: usize = 100;

/// One outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailData {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub content: String,
}

/// Sending half of the mail queue, cloned into the application state
#[derive(Debug, Clone)]
pub struct MailQueue {
    sender: mpsc::Sender<MailData>,
}

impl MailQueue {
    /// Creates a queue and the receiver its listener reads from
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<MailData>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queues `message` without waiting; `false` when it was dropped
    pub fn queue(&self, message: MailData) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(to = %message.to, subject = %message.subject, "Mail queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(message)) => {
                warn!(to = %message.to, subject = %message.subject, "Mail listener gone, dropping message");
                false
            }
        }
    }
}

/// Guest confirmation and owner notification for a stored reservation
pub fn booking_messages(reservation: &Reservation, config: &MailConfig) -> [MailData; 2] {
    let room = &reservation.room.room_name;
    let start = reservation.start_date.format("%Y-%m-%d");
    let end = reservation.end_date.format("%Y-%m-%d");

    let guest = MailData {
        to: reservation.email.clone(),
        from: config.from.clone(),
        subject: "Reservation Confirmation".to_string(),
        content: format!(
            "Dear {},\n\nThis is to confirm your reservation of the {} from {} to {}.\n",
            reservation.first_name, room, start, end
        ),
    };

    let owner = MailData {
        to: config.owner.clone(),
        from: config.from.clone(),
        subject: "Reservation Notification".to_string(),
        content: format!(
            "A reservation has been made for the {} from {} to {}.\nGuest: {} <{}>, phone {}\n",
            room,
            start,
            end,
            reservation.guest_name(),
            reservation.email,
            reservation.phone
        ),
    };

    [guest, owner]
}

fn deliver(message: &MailData) {
    info!(
        to = %message.to,
        from = %message.from,
        subject = %message.subject,
        bytes = message.content.len(),
        "Mail delivered"
    );
}

/// Delivers queued mail until `shutdown` is cancelled or every sender is dropped
///
/// Messages already queued at shutdown are still delivered. The task returns how many
/// messages it delivered.
pub fn spawn_mail_listener(
    mut receiver: mpsc::Receiver<MailData>,
    shutdown: CancellationToken,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        info!("Mail listener started");
        let mut delivered = 0usize;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                message = receiver.recv() => match message {
                    Some(message) => {
                        deliver(&message);
                        delivered += 1;
                    }
                    None => break,
                },
            }
        }

        receiver.close();
        while let Ok(message) = receiver.try_recv() {
            deliver(&message);
            delivered += 1;
        }

        info!(delivered, "Mail listener stopping");
        delivered
    })
}
