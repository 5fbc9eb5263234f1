//! Ownership guard: the authorisation predicates shared by every mutating
//! operation.
//!
//! Lock policy (single, deliberate choice where the original wavered): a
//! locked question rejects new answers, edits to the question itself, and
//! votes on the question. It does not block editing or deleting answers that
//! already exist, nor voting on those answers.

use super::error::Error;
use super::question::Question;
use super::user::UserId;
use super::votes::Votable;

/// May the actor edit the question's title, body, or tags?
pub fn can_edit_question(question: &Question, actor: &UserId) -> Result<(), Error> {
    if question.owner != *actor {
        return Err(Error::forbidden("only the author may edit this question"));
    }
    if question.locked {
        return Err(Error::forbidden(
            "this question is locked and cannot be edited",
        ));
    }
    Ok(())
}

/// May the actor delete the question? Deletion is allowed even when locked.
pub fn can_delete_question(question: &Question, actor: &UserId) -> Result<(), Error> {
    if question.owner != *actor {
        return Err(Error::forbidden("only the author may delete this question"));
    }
    Ok(())
}

/// May the actor vote on the question?
pub fn can_vote_question(question: &Question, actor: &UserId) -> Result<(), Error> {
    if question.owner == *actor {
        return Err(Error::forbidden("you cannot vote on your own question"));
    }
    if question.locked {
        return Err(Error::forbidden(
            "this question is locked and no longer accepts votes",
        ));
    }
    Ok(())
}

/// May the actor vote on the answer? Answer votes are never lock-gated.
pub fn can_vote_answer(answer: &impl Votable, actor: &UserId) -> Result<(), Error> {
    if answer.owner() == actor {
        return Err(Error::forbidden("you cannot vote on your own answer"));
    }
    Ok(())
}

/// May the actor answer the question?
pub fn can_answer(question: &Question, actor: &UserId) -> Result<(), Error> {
    if question.owner == *actor {
        return Err(Error::forbidden("you cannot answer your own question"));
    }
    if question.locked {
        return Err(Error::forbidden(
            "this question is locked and no longer accepts answers",
        ));
    }
    Ok(())
}

/// May the actor edit the answer? Parent-question lock does not apply.
pub fn can_edit_answer(owner: &UserId, actor: &UserId) -> Result<(), Error> {
    if owner != actor {
        return Err(Error::forbidden("only the author may edit this answer"));
    }
    Ok(())
}

/// May the actor delete the answer?
pub fn can_delete_answer(owner: &UserId, actor: &UserId) -> Result<(), Error> {
    if owner != actor {
        return Err(Error::forbidden("only the author may delete this answer"));
    }
    Ok(())
}

/// May the actor lock or unlock the question?
pub fn can_lock_toggle(question: &Question, actor: &UserId) -> Result<(), Error> {
    if question.owner != *actor {
        return Err(Error::forbidden(
            "only the author may lock or unlock this question",
        ));
    }
    Ok(())
}
