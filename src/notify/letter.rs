use crate::participant::Participant;

pub const SUBJECT: &str = "🎁 Secret Santa - your assignment!";

/// A rendered message for one gift giver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letter {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Tells `giver` who they give to and what that person wishes for
pub fn compose_letter(giver: &Participant, recipient: &Participant) -> Letter {
    let body = format!(
        "Hi, {giver}! 🎄\n\
         \n\
         Happy holidays!\n\
         \n\
         Your Secret Santa assignment is ready:\n\
         \n\
         🎁 You are giving a gift to: {recipient}\n\
         📝 Their wishes: {wishes}\n\
         \n\
         Make it a surprise to remember!\n\
         \n\
         Thanks for taking part! 🎅\n\
         \n\
         ---\n\
         This message was sent by the Secret Santa app\n",
        giver = giver.name,
        recipient = recipient.name,
        wishes = recipient.wishes_or_placeholder(),
    );

    Letter {
        to_name: giver.name.clone(),
        to_email: giver.email.clone(),
        subject: SUBJECT.to_string(),
        body,
    }
}
