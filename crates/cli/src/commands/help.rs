use cqlmig_core::{TOOL_NAME, VERSION};

const USAGE: &str = r#"USAGE:
    cqlmig <COMMAND> <KEYSPACE> [OPTIONS]

COMMANDS:
    generate <keyspace> --name <Name>   Create <migrations-dir>/<keyspace>/<timestamp>_<name>.xml
    migrate <keyspace>                  Apply every pending migration in identity order
    rollback <keyspace>                 Run the down section of the latest applied migration
    create-keyspace <keyspace>          Create the keyspace on a local node (SimpleStrategy, RF 1)
    current <keyspace>                  Print the latest applied migration
    status <keyspace>                   List migrations as applied or pending
    help                                Show this message

OPTIONS:
    --host, --ip <HOST>        Node to connect to [default: 127.0.0.1]
    --port <PORT>              Native protocol port [default: 9042]
    --username <USER>          Username, requires --password
    --password <PASSWORD>      Password, requires --username
    --con <LEVEL>              Ledger consistency [default: LOCAL_QUORUM]
    --timeout <SECS>           Request timeout [default: 60]
    --migrations-dir <DIR>     Migrations root [default: migrations]
    --config <FILE>            Settings file [default: cqlmig.yaml if present]
    --log-level <LEVEL>        trace, debug, info, warn or error
    --log-format <FORMAT>      text, pretty or json

ENVIRONMENT:
    CQLMIG_HOST, CQLMIG_PORT, CQLMIG_USERNAME, CQLMIG_PASSWORD, CQLMIG_CONSISTENCY,
    CQLMIG_TIMEOUT, CQLMIG_MIGRATIONS_DIR, RUST_LOG

EXAMPLES:
    cqlmig generate global --name CreateUsersTable
    cqlmig migrate global --host 127.0.0.1 --con LOCAL_QUORUM
    cqlmig rollback global
    cqlmig createKeyspace global
    cqlmig current global

Each migration file holds one <up> and one <down> section; every statement
goes in its own <cql><![CDATA[ ... ]]></cql> block. A statement that fails
during migrate is logged and the migration is left out of the ledger.
"#;

pub fn print() {
    println!("{} {}\n", TOOL_NAME, VERSION);
    print!("{}", USAGE);
}
