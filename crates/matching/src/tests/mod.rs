//! Service-Testsuite fuer die Vermittlungs-Engine
