//! Query command kinds and the code shape each one generates.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::{error::GenError, opts::SqlDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    One,
    Many,
    Exec,
    ExecRows,
    ExecLastId,
    ExecResult,
    CopyFrom,
    BatchExec,
    BatchMany,
    BatchOne,
}

/// Which database call a query method issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    QueryRow,
    Query,
    Exec,
    CopyFrom,
    SendBatch,
}

/// How the call's result is bound in the generated method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultBinding {
    Row,
    Rows,
    Discard,
    Result,
    Direct,
    Batch,
}

impl ResultBinding {
    pub fn as_go(self) -> &'static str {
        match self {
            ResultBinding::Row => "row :=",
            ResultBinding::Rows => "rows, err :=",
            ResultBinding::Discard => "_, err :=",
            ResultBinding::Result => "result, err :=",
            ResultBinding::Direct => "return",
            ResultBinding::Batch => "br :=",
        }
    }
}

/// Generation switches that change how a call is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallStyle {
    pub driver: SqlDriver,
    pub prepared: bool,
    pub db_argument: bool,
}

impl CallStyle {
    fn receiver(self) -> &'static str {
        match self.db_argument {
            true => "db",
            false => "q.db",
        }
    }

    /// pgx has no prepared statement cache of its own in the generated code.
    fn uses_prepared(self) -> bool {
        self.prepared && !self.driver.is_pgx()
    }
}

impl CommandKind {
    pub const ALL: [CommandKind; 10] = [
        CommandKind::One,
        CommandKind::Many,
        CommandKind::Exec,
        CommandKind::ExecRows,
        CommandKind::ExecLastId,
        CommandKind::ExecResult,
        CommandKind::CopyFrom,
        CommandKind::BatchExec,
        CommandKind::BatchMany,
        CommandKind::BatchOne,
    ];

    pub fn parse(cmd: &str) -> Result<Self, GenError> {
        Ok(match cmd {
            ":one" => CommandKind::One,
            ":many" => CommandKind::Many,
            ":exec" => CommandKind::Exec,
            ":execrows" => CommandKind::ExecRows,
            ":execlastid" => CommandKind::ExecLastId,
            ":execresult" => CommandKind::ExecResult,
            ":copyfrom" => CommandKind::CopyFrom,
            ":batchexec" => CommandKind::BatchExec,
            ":batchmany" => CommandKind::BatchMany,
            ":batchone" => CommandKind::BatchOne,
            other => Err(GenError::malformed(format!(
                "unhandled query command kind {other:?}"
            )))?,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::One => ":one",
            CommandKind::Many => ":many",
            CommandKind::Exec => ":exec",
            CommandKind::ExecRows => ":execrows",
            CommandKind::ExecLastId => ":execlastid",
            CommandKind::ExecResult => ":execresult",
            CommandKind::CopyFrom => ":copyfrom",
            CommandKind::BatchExec => ":batchexec",
            CommandKind::BatchMany => ":batchmany",
            CommandKind::BatchOne => ":batchone",
        }
    }

    pub fn is_batch(self) -> bool {
        matches!(
            self,
            CommandKind::BatchExec | CommandKind::BatchMany | CommandKind::BatchOne
        )
    }

    /// Commands whose generated method scans rows into the return value.
    pub fn scans_rows(self) -> bool {
        match self {
            CommandKind::One | CommandKind::Many | CommandKind::BatchMany | CommandKind::BatchOne => {
                true
            }
            CommandKind::Exec
            | CommandKind::ExecRows
            | CommandKind::ExecLastId
            | CommandKind::ExecResult
            | CommandKind::CopyFrom
            | CommandKind::BatchExec => false,
        }
    }

    /// Commands that cannot be generated without at least one argument.
    pub fn requires_argument(self) -> bool {
        match self {
            CommandKind::CopyFrom
            | CommandKind::BatchExec
            | CommandKind::BatchMany
            | CommandKind::BatchOne => true,
            CommandKind::One
            | CommandKind::Many
            | CommandKind::Exec
            | CommandKind::ExecRows
            | CommandKind::ExecLastId
            | CommandKind::ExecResult => false,
        }
    }

    pub fn invocation(self) -> Invocation {
        match self {
            CommandKind::One => Invocation::QueryRow,
            CommandKind::Many => Invocation::Query,
            CommandKind::Exec
            | CommandKind::ExecRows
            | CommandKind::ExecLastId
            | CommandKind::ExecResult => Invocation::Exec,
            CommandKind::CopyFrom => Invocation::CopyFrom,
            CommandKind::BatchExec | CommandKind::BatchMany | CommandKind::BatchOne => {
                Invocation::SendBatch
            }
        }
    }

    pub fn result_binding(self) -> ResultBinding {
        match self {
            CommandKind::One => ResultBinding::Row,
            CommandKind::Many => ResultBinding::Rows,
            CommandKind::Exec => ResultBinding::Discard,
            CommandKind::ExecRows | CommandKind::ExecLastId => ResultBinding::Result,
            CommandKind::ExecResult | CommandKind::CopyFrom => ResultBinding::Direct,
            CommandKind::BatchExec | CommandKind::BatchMany | CommandKind::BatchOne => {
                ResultBinding::Batch
            }
        }
    }

    /// The callee of the generated database call, e.g. `q.db.QueryRowContext`.
    pub fn query_method(self, style: CallStyle) -> String {
        let receiver = style.receiver();
        let invocation = self.invocation();
        if style.driver.is_pgx() {
            let method = match invocation {
                Invocation::QueryRow => "QueryRow",
                Invocation::Query => "Query",
                Invocation::Exec => "Exec",
                Invocation::CopyFrom => "CopyFrom",
                Invocation::SendBatch => "SendBatch",
            };
            return format!("{receiver}.{method}");
        }
        if style.uses_prepared() {
            let method = match invocation {
                Invocation::QueryRow => "q.queryRow",
                Invocation::Query => "q.query",
                Invocation::Exec | Invocation::CopyFrom | Invocation::SendBatch => "q.exec",
            };
            return method.to_owned();
        }
        let method = match invocation {
            Invocation::QueryRow => "QueryRowContext",
            Invocation::Query => "QueryContext",
            Invocation::Exec | Invocation::CopyFrom | Invocation::SendBatch => "ExecContext",
        };
        format!("{receiver}.{method}")
    }

    /// Full statement issuing the query, e.g. `row := q.db.QueryRowContext(ctx, getAuthor, id)`.
    pub fn call_statement(
        self,
        style: CallStyle,
        constant: &str,
        statement_field: &str,
        params: &str,
    ) -> String {
        let mut args = vec!["ctx".to_owned()];
        if style.uses_prepared() {
            args.push(format!("q.{statement_field}"));
        }
        args.push(constant.to_owned());
        let mut call_args = args.join(", ");
        if !params.is_empty() {
            match params.starts_with('\n') {
                true => call_args.push(','),
                false => call_args.push_str(", "),
            }
            call_args.push_str(params);
        }
        format!(
            "{} {}({call_args})",
            self.result_binding().as_go(),
            self.query_method(style)
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for CommandKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STDLIB: CallStyle = CallStyle {
        driver: SqlDriver::LibPq,
        prepared: false,
        db_argument: false,
    };

    #[test]
    fn parse_round_trips_every_kind() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(matches!(
            CommandKind::parse(":fetch"),
            Err(GenError::MalformedInput { .. })
        ));
    }

    #[test]
    fn result_bindings() {
        let expected = [
            (CommandKind::One, "row :="),
            (CommandKind::Many, "rows, err :="),
            (CommandKind::Exec, "_, err :="),
            (CommandKind::ExecRows, "result, err :="),
            (CommandKind::ExecLastId, "result, err :="),
            (CommandKind::ExecResult, "return"),
        ];
        for (kind, binding) in expected {
            assert_eq!(kind.result_binding().as_go(), binding, "{kind}");
        }
    }

    #[test]
    fn stdlib_query_methods() {
        let db_argument = CallStyle {
            db_argument: true,
            ..STDLIB
        };
        let prepared = CallStyle {
            prepared: true,
            ..STDLIB
        };
        let expected = [
            (CommandKind::One, "q.db.QueryRowContext", "db.QueryRowContext", "q.queryRow"),
            (CommandKind::Many, "q.db.QueryContext", "db.QueryContext", "q.query"),
            (CommandKind::Exec, "q.db.ExecContext", "db.ExecContext", "q.exec"),
            (CommandKind::ExecRows, "q.db.ExecContext", "db.ExecContext", "q.exec"),
            (CommandKind::ExecLastId, "q.db.ExecContext", "db.ExecContext", "q.exec"),
            (CommandKind::ExecResult, "q.db.ExecContext", "db.ExecContext", "q.exec"),
        ];
        for (kind, plain, threaded, cached) in expected {
            assert_eq!(kind.query_method(STDLIB), plain);
            assert_eq!(kind.query_method(db_argument), threaded);
            assert_eq!(kind.query_method(prepared), cached);
        }
    }

    #[test]
    fn pgx_query_methods_ignore_prepared_mode() {
        let style = CallStyle {
            driver: SqlDriver::PgxV5,
            prepared: true,
            db_argument: false,
        };
        assert_eq!(CommandKind::One.query_method(style), "q.db.QueryRow");
        assert_eq!(CommandKind::Many.query_method(style), "q.db.Query");
        assert_eq!(CommandKind::ExecResult.query_method(style), "q.db.Exec");
        let style = CallStyle {
            db_argument: true,
            prepared: false,
            ..style
        };
        assert_eq!(CommandKind::CopyFrom.query_method(style), "db.CopyFrom");
    }

    #[test]
    fn call_statements() {
        assert_eq!(
            CommandKind::One.call_statement(STDLIB, "getAuthor", "getAuthorStmt", "id"),
            "row := q.db.QueryRowContext(ctx, getAuthor, id)"
        );
        assert_eq!(
            CommandKind::Many.call_statement(STDLIB, "listAuthors", "listAuthorsStmt", ""),
            "rows, err := q.db.QueryContext(ctx, listAuthors)"
        );
        let prepared = CallStyle {
            prepared: true,
            ..STDLIB
        };
        assert_eq!(
            CommandKind::ExecResult.call_statement(prepared, "deleteAuthor", "deleteAuthorStmt", "id"),
            "return q.exec(ctx, q.deleteAuthorStmt, deleteAuthor, id)"
        );
    }
}
