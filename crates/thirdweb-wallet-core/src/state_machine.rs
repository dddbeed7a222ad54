use crate::ports::WalletError;

/// Lifecycle of one browser-assisted login (OAuth or SIWE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    LinkFetched,
    Listening,
    CallbackReceived,
    Completing,
    Done,
    Failed,
}

impl LoginState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoginState::Done | LoginState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    LinkFetched,
    ListenerBound,
    CallbackArrived,
    BeginSignIn,
    SignInFinished,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: LoginState,
    pub to: LoginState,
    pub reason: &'static str,
}

pub fn login_transition(
    state: LoginState,
    action: LoginAction,
) -> Result<(LoginState, StateTransition), WalletError> {
    use LoginAction as A;
    use LoginState as S;

    let (to, reason) = match (state, action) {
        (S::Idle, A::LinkFetched) => (S::LinkFetched, "login link fetched"),
        (S::LinkFetched, A::ListenerBound) => (S::Listening, "loopback listener bound"),
        (S::Listening, A::CallbackArrived) => (S::CallbackReceived, "redirect captured"),
        (S::CallbackReceived, A::BeginSignIn) => (S::Completing, "listener torn down"),
        (S::Completing, A::SignInFinished) => (S::Done, "sign-in finished"),
        (from, A::Fail) if !from.is_terminal() => (S::Failed, "login failed"),
        (from, action) => {
            return Err(WalletError::IllegalTransition(format!(
                "{from:?} --{action:?}-->"
            )))
        }
    };
    Ok((
        to,
        StateTransition {
            from: state,
            to,
            reason,
        },
    ))
}
