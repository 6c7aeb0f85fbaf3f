use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while compiling a rule set or enforcing it on a query.
///
/// Deny errors name the tier that refused the operation and nothing else;
/// the contents of the rule fragment never appear in the message.
#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error("Malformed rule configuration: {0}")]
    #[diagnostic(
        code(rowgate::schema),
        help("The rule set must be a JSON object with optional `groups` and `rules` sections")
    )]
    Schema(#[from] serde_json::Error),

    #[error("Invalid rule configuration: {0}")]
    #[diagnostic(
        code(rowgate::config),
        help("Subject keys are `g:<group>`, `u:<uid>`, `s:<state>`, or `default`; referenced groups must be declared in `groups`")
    )]
    Config(String),

    #[error("Invalid update rule for subject `{subject}` on table `{table}`")]
    #[diagnostic(code(rowgate::update_rule))]
    UpdateRule {
        table: String,
        subject: String,
        #[source]
        source: Box<RuleError>,
    },

    #[error("Update document mixes bare fields with $-prefixed operators")]
    #[diagnostic(
        code(rowgate::mixed_update),
        help("An update document uses either bare `field: value` assignments or $-operators, never both")
    )]
    MixedUpdateForms,

    #[error("Operator `{0}` requires an object argument")]
    #[diagnostic(code(rowgate::operator_shape))]
    OperatorShape(String),

    #[error("Unknown update operator `{0}`")]
    #[diagnostic(
        code(rowgate::unknown_operator),
        help("Recognized operators: $set, $inc, $min, $max, $mul, $currentDate ($comment is accepted and ignored)")
    )]
    UnknownOperator(String),

    #[error("Permission denied by rule for user state `{0}`")]
    #[diagnostic(code(rowgate::deny_state))]
    DenyState(String),

    #[error("Permission denied by rule for group `{0}`")]
    #[diagnostic(code(rowgate::deny_group))]
    DenyGroup(String),

    #[error("Permission denied by user rule")]
    #[diagnostic(code(rowgate::deny_user))]
    DenyUser,

    #[error("Permission denied by default rule")]
    #[diagnostic(code(rowgate::deny_default))]
    DenyDefault,
}
