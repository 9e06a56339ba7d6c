//! Pest grammar for Prisma schema files.

use pest_derive::Parser;

/// The Prisma schema parser.
#[derive(Parser)]
#[grammar = "parser/prisma.pest"]
pub struct PrismaParser;

#[cfg(test)]
mod tests {
    use super::*;
    use pest::Parser;

    #[test]
    fn test_parse_identifier() {
        assert!(PrismaParser::parse(Rule::identifier, "User").is_ok());
    }

    #[test]
    fn test_parse_field_type() {
        assert!(PrismaParser::parse(Rule::field_type, "String?").is_ok());
        assert!(PrismaParser::parse(Rule::field_type, "Post[]").is_ok());
        assert!(PrismaParser::parse(Rule::field_type, "Unsupported(\"tsvector\")?").is_ok());
    }

    #[test]
    fn test_parse_attribute() {
        assert!(PrismaParser::parse(Rule::field_attribute, "@id").is_ok());
        assert!(PrismaParser::parse(Rule::field_attribute, "@default(autoincrement())").is_ok());
        assert!(PrismaParser::parse(Rule::field_attribute, "@db.VarChar(255)").is_ok());

        let result = PrismaParser::parse(
            Rule::field_attribute,
            "@relation(fields: [authorId], references: [id], onDelete: Cascade)",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_model() {
        let input = r#"model User {
            id    Int    @id @default(autoincrement())
            email String @unique // login
            posts Post[]

            @@map("users")
        }"#;
        let result = PrismaParser::parse(Rule::model_def, input);
        assert!(result.is_ok(), "Failed to parse model: {:?}", result.err());
    }

    #[test]
    fn test_parse_enum() {
        let input = r#"enum Role {
            USER
            ADMIN @map("admin")

            @@map("roles")
        }"#;
        assert!(PrismaParser::parse(Rule::enum_def, input).is_ok());
    }

    #[test]
    fn test_parse_datasource() {
        let input = r#"datasource db {
            provider = "postgresql"
            url      = env("DATABASE_URL")
        }"#;
        assert!(PrismaParser::parse(Rule::config_block, input).is_ok());
    }

    #[test]
    fn test_reject_unclosed_model() {
        assert!(PrismaParser::parse(Rule::schema, "model User {\n id Int @id\n").is_err());
    }
}
